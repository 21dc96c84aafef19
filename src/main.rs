#[macro_use]
extern crate custom_derive;
#[macro_use]
extern crate enum_derive;

mod cli;
mod config;
mod evdev;
mod frames;
mod report;
mod tracker;
mod worker;

use crate::config::Config;
use crate::report::{Rect, Reporter};
use crate::worker::TrackerWorker;
use clap::App;

#[derive(Debug, PartialEq)]
pub struct ErrorString(pub String);

impl<E: std::error::Error> From<E> for ErrorString {
    fn from(error: E) -> ErrorString {
        ErrorString(format!("{}", error))
    }
}

pub trait AddMessage<A> {
    fn add_message(self, message: String) -> Result<A, ErrorString>;
}

impl<A, E> AddMessage<A> for Result<A, E>
where
    ErrorString: From<E>,
{
    fn add_message(self, message: String) -> Result<A, ErrorString> {
        self.map_err(|error| {
            let ErrorString(inner) = ErrorString::from(error);
            ErrorString(format!("{}: {}", message, inner))
        })
    }
}

pub fn get_binary_name() -> Result<String, ErrorString> {
    let executable = std::env::args()
        .next()
        .ok_or_else(|| ErrorString("argv is empty".to_string()))?;
    let binary_name = executable
        .rsplit('/')
        .next()
        .ok_or_else(|| ErrorString(format!("invalid executable path: {}", executable)))?
        .to_string();
    Ok(binary_name)
}

fn main() -> Result<(), ErrorString> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cli::parse(App::new(get_binary_name()?))?;
    let config = Config::from_spec(&args.spec)?;
    let path = args
        .device
        .clone()
        .or_else(|| config.device.clone())
        .or_else(evdev::find_touch_device)
        .ok_or_else(|| {
            ErrorString("no touch screen found, use --device or --spec to name one".to_string())
        })?;
    let info = evdev::probe(&path)?;
    log::info!(
        "tracking {} ({}): x {}..{}, y {}..{}, {} protocol, {}",
        info.name,
        path,
        info.x_min,
        info.x_max,
        info.y_min,
        info.y_max,
        if info.type_b { "type B" } else { "type A" },
        if info.has_pressure() {
            format!("pressure {}..{}", info.pressure_min, info.pressure_max)
        } else {
            "no pressure range".to_string()
        },
    );
    if config.force_window {
        log::warn!("force_window: no window system here, mapping against --screen instead");
    }
    let (screen_width, screen_height) = args.screen;
    let target = Rect::new(0.0, 0.0, screen_width, screen_height);
    let reporter = Reporter::new(info.clone(), target, &config);
    let worker = TrackerWorker::open(path, config.grab, info, reporter);
    for frame in worker.frames() {
        for point in &frame.points {
            println!("{:?}", point);
        }
    }
    Ok(())
}

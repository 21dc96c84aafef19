use crate::ErrorString;
use clap::{App, Arg};

const DEFAULT_SCREEN: &str = "1920x1080";

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub device: Option<String>,
    pub spec: String,
    pub screen: (f64, f64),
}

pub fn parse<'a, 'b>(app: App<'a, 'b>) -> Result<Args, ErrorString> {
    let matches = app
        .version("0.1.0")
        .about("contact tracker for evdev touch screens")
        .arg(
            Arg::with_name("device")
                .long("device")
                .value_name("PATH")
                .help("Touch screen device node (default: auto-detected)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("spec")
                .long("spec")
                .value_name("SPEC")
                .help(
                    "Colon-separated device specification, recognized options: \
                     a /dev/ path, force_window, grab, invertx, inverty, rotate=<degrees>",
                )
                .takes_value(true),
        )
        .arg(
            Arg::with_name("screen")
                .long("screen")
                .value_name("WIDTHxHEIGHT")
                .help("Geometry of the screen touches are mapped onto (default: 1920x1080)")
                .takes_value(true),
        )
        .get_matches();
    let device = matches.value_of("device").map(String::from);
    let spec = matches.value_of("spec").unwrap_or("").to_string();
    let screen = parse_screen(matches.value_of("screen").unwrap_or(DEFAULT_SCREEN))?;
    Ok(Args {
        device,
        spec,
        screen,
    })
}

fn parse_screen(input: &str) -> Result<(f64, f64), ErrorString> {
    let mut parts = input.splitn(2, 'x');
    let width = parts.next().and_then(|part| part.parse::<f64>().ok());
    let height = parts.next().and_then(|part| part.parse::<f64>().ok());
    match (width, height) {
        (Some(width), Some(height)) if width > 0.0 && height > 0.0 => Ok((width, height)),
        _ => Err(ErrorString(format!(
            "invalid screen geometry: {}, expected WIDTHxHEIGHT",
            input
        ))),
    }
}

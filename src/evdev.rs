use crate::AddMessage;
use crate::ErrorString;
use evdev_rs::enums::{EventCode, EV_ABS, EV_SYN};
use evdev_rs::{AbsInfo, Device, DeviceWrapper, GrabMode, InputEvent, ReadFlag, ReadStatus};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags};
use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const POLL_INTERVAL_MILLISECONDS: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PositionX,
    PositionY,
    TrackingId,
    ContactSize,
    Pressure,
    SlotSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchInput {
    Field { field: Field, value: i32 },
    MtReport,
    Report,
    Ignored,
}

pub fn decode(event: &InputEvent) -> TouchInput {
    let field = |field| TouchInput::Field {
        field,
        value: event.value,
    };
    match event.event_code {
        EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X) => field(Field::PositionX),
        EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_Y) => field(Field::PositionY),
        EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID) => field(Field::TrackingId),
        EventCode::EV_ABS(EV_ABS::ABS_MT_TOUCH_MAJOR) => field(Field::ContactSize),
        EventCode::EV_ABS(EV_ABS::ABS_MT_PRESSURE) => field(Field::Pressure),
        EventCode::EV_ABS(EV_ABS::ABS_PRESSURE) => field(Field::Pressure),
        EventCode::EV_ABS(EV_ABS::ABS_MT_SLOT) => field(Field::SlotSelect),
        EventCode::EV_SYN(EV_SYN::SYN_MT_REPORT) => TouchInput::MtReport,
        EventCode::EV_SYN(EV_SYN::SYN_REPORT) => TouchInput::Report,
        _ => TouchInput::Ignored,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: String,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub pressure_min: i32,
    pub pressure_max: i32,
    pub type_b: bool,
}

impl DeviceInfo {
    fn from_device(device: &Device) -> DeviceInfo {
        let axis = |code: EV_ABS| device.abs_info(&EventCode::EV_ABS(code));
        let x = axis(EV_ABS::ABS_MT_POSITION_X).or_else(|| axis(EV_ABS::ABS_X));
        let y = axis(EV_ABS::ABS_MT_POSITION_Y).or_else(|| axis(EV_ABS::ABS_Y));
        let pressure = axis(EV_ABS::ABS_MT_PRESSURE).or_else(|| axis(EV_ABS::ABS_PRESSURE));
        let (x_min, x_max) = range_or_default(x, "x");
        let (y_min, y_max) = range_or_default(y, "y");
        let (pressure_min, pressure_max) = pressure
            .map(|info| (info.minimum, info.maximum))
            .unwrap_or((0, 0));
        DeviceInfo {
            name: device.name().unwrap_or("unknown").to_string(),
            x_min,
            x_max,
            y_min,
            y_max,
            pressure_min,
            pressure_max,
            type_b: axis(EV_ABS::ABS_MT_SLOT).is_some(),
        }
    }

    pub fn has_pressure(&self) -> bool {
        self.pressure_max > self.pressure_min
    }
}

fn range_or_default(info: Option<AbsInfo>, axis: &str) -> (i32, i32) {
    match info {
        Some(info) if info.maximum > info.minimum => (info.minimum, info.maximum),
        _ => {
            log::warn!("device reports no usable {} range, assuming 0..65535", axis);
            (0, 65535)
        }
    }
}

pub fn probe(path: &str) -> Result<DeviceInfo, ErrorString> {
    let device =
        Device::new_from_path(path).add_message(format!("cannot open device: {}", path))?;
    Ok(DeviceInfo::from_device(&device))
}

pub fn find_touch_device() -> Option<String> {
    let entries = std::fs::read_dir("/dev/input").ok()?;
    let mut paths: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with("event"))
        })
        .filter_map(|path| path.to_str().map(String::from))
        .collect();
    paths.sort();
    for path in paths {
        if let Ok(device) = Device::new_from_path(&path) {
            if device
                .abs_info(&EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X))
                .is_some()
            {
                return Some(path);
            }
        }
    }
    None
}

pub struct InputEventSource {
    device: Device,
    fd: RawFd,
    stop: Arc<AtomicBool>,
}

impl InputEventSource {
    pub fn new(
        path: &str,
        grab: bool,
        stop: Arc<AtomicBool>,
    ) -> Result<InputEventSource, ErrorString> {
        let file = File::open(path).add_message(format!("cannot open device: {}", path))?;
        let fd = file.as_raw_fd();
        // Non-blocking reads, the iterator waits for readiness itself so the
        // stop flag keeps getting checked.
        fcntl(fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .add_message(format!("cannot configure {}", path))?;
        let mut device =
            Device::new_from_file(file).add_message(format!("libevdev rejected {}", path))?;
        if grab {
            device
                .grab(GrabMode::Grab)
                .add_message(format!("cannot grab {}", path))?;
        }
        Ok(InputEventSource { device, fd, stop })
    }
}

impl Iterator for InputEventSource {
    type Item = InputEvent;

    fn next(&mut self) -> Option<InputEvent> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return None;
            }
            match self.device.next_event(ReadFlag::NORMAL) {
                Ok((status, event)) => {
                    if let ReadStatus::Sync = status {
                        log::warn!("touch event stream out of sync, kernel dropped events");
                    }
                    return Some(event);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];
                    match poll(&mut fds, POLL_INTERVAL_MILLISECONDS) {
                        Ok(_) => continue,
                        Err(Errno::EINTR) => continue,
                        Err(error) => {
                            log::error!("poll failed on touch device: {}", error);
                            return None;
                        }
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    log::error!("touch device lost: {}", error);
                    return None;
                }
            }
        }
    }
}

pub struct SynChunkSource {
    input_event_source: Box<dyn Iterator<Item = InputEvent>>,
}

impl SynChunkSource {
    pub fn new(input_event_source: impl Iterator<Item = InputEvent> + 'static) -> SynChunkSource {
        SynChunkSource {
            input_event_source: Box::new(input_event_source),
        }
    }
}

impl std::fmt::Debug for SynChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<SynChunkSource>")
    }
}

fn is_syn_dropped_event(event: &InputEvent) -> bool {
    event.event_code == EventCode::EV_SYN(EV_SYN::SYN_DROPPED)
}

fn is_syn_report_event(event: &InputEvent) -> bool {
    event.event_code == EventCode::EV_SYN(EV_SYN::SYN_REPORT)
}

impl Iterator for SynChunkSource {
    type Item = Vec<InputEvent>;

    fn next(&mut self) -> Option<Vec<InputEvent>> {
        let mut result = vec![];
        loop {
            match self.input_event_source.next() {
                None => {
                    if result.is_empty() {
                        return None;
                    } else {
                        break;
                    }
                }
                Some(event) => {
                    if is_syn_dropped_event(&event) {
                        log::warn!("dropped events");
                    } else if is_syn_report_event(&event) {
                        break;
                    } else {
                        result.push(event);
                    }
                }
            }
        }
        Some(result)
    }
}

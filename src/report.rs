use crate::config::{Config, Rotation};
use crate::evdev::DeviceInfo;
use crate::tracker::{Contact, ContactState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered_at(center_x: f64, center_y: f64, width: f64, height: f64) -> Rect {
        Rect {
            x: center_x - width / 2.0,
            y: center_y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub state: ContactState,
    pub normal_position: (f64, f64),
    pub area: Rect,
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub points: Vec<TouchPoint>,
}

#[derive(Debug, Clone)]
pub struct Reporter {
    info: DeviceInfo,
    target: Rect,
    rotation: Rotation,
    invert_x: bool,
    invert_y: bool,
}

impl Reporter {
    pub fn new(info: DeviceInfo, target: Rect, config: &Config) -> Reporter {
        Reporter {
            info,
            target,
            rotation: config.rotation,
            invert_x: config.invert_x,
            invert_y: config.invert_y,
        }
    }

    pub fn touch_frame(&self, contacts: &[Contact]) -> Frame {
        Frame {
            points: contacts
                .iter()
                .map(|contact| self.touch_point(contact))
                .collect(),
        }
    }

    fn touch_point(&self, contact: &Contact) -> TouchPoint {
        let x_span = f64::from(self.info.x_max - self.info.x_min);
        let y_span = f64::from(self.info.y_max - self.info.y_min);
        let normal_x = f64::from(contact.x - self.info.x_min) / x_span;
        let normal_y = f64::from(contact.y - self.info.y_min) / y_span;
        let (mut normal_x, mut normal_y) = match self.rotation {
            Rotation::Deg0 => (normal_x, normal_y),
            Rotation::Deg90 => (normal_y, 1.0 - normal_x),
            Rotation::Deg180 => (1.0 - normal_x, 1.0 - normal_y),
            Rotation::Deg270 => (1.0 - normal_y, normal_x),
        };
        if self.invert_x {
            normal_x = 1.0 - normal_x;
        }
        if self.invert_y {
            normal_y = 1.0 - normal_y;
        }
        let mapped_x = self.target.x + normal_x * self.target.width;
        let mapped_y = self.target.y + normal_y * self.target.height;
        let size_ratio = (self.target.width + self.target.height) / (x_span + y_span);
        let side = f64::from(contact.maj) * size_ratio;
        let pressure = if self.info.has_pressure() {
            f64::from(contact.pressure - self.info.pressure_min)
                / f64::from(self.info.pressure_max - self.info.pressure_min)
        } else if contact.state == ContactState::Released {
            0.0
        } else {
            1.0
        };
        TouchPoint {
            id: contact.tracking_id,
            state: contact.state,
            normal_position: (normal_x, normal_y),
            area: Rect::centered_at(mapped_x, mapped_y, side, side),
            pressure,
        }
    }
}

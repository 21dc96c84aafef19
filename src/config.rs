use crate::ErrorString;

custom_derive! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, IterVariants(RotationVariants))]
    pub enum Rotation {
        Deg0,
        Deg90,
        Deg180,
        Deg270,
    }
}

impl Default for Rotation {
    fn default() -> Rotation {
        Rotation::Deg0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub device: Option<String>,
    pub force_window: bool,
    pub grab: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub rotation: Rotation,
}

impl Config {
    pub fn from_spec(spec: &str) -> Result<Config, ErrorString> {
        let mut config = Config::default();
        for token in spec.split(':') {
            if token.is_empty() {
                continue;
            }
            if token.starts_with("/dev/") {
                config.device = Some(token.to_string());
            } else if token == "force_window" {
                config.force_window = true;
            } else if token == "grab" {
                config.grab = true;
            } else if token == "invertx" {
                config.invert_x = true;
            } else if token == "inverty" {
                config.invert_y = true;
            } else if let Some(value) = token.strip_prefix("rotate=") {
                config.rotation = parse_rotation(value)?;
            } else {
                log::warn!("ignoring unknown device specification option: {}", token);
            }
        }
        Ok(config)
    }
}

fn parse_rotation(input: &str) -> Result<Rotation, ErrorString> {
    match input {
        "0" => Ok(Rotation::Deg0),
        "90" => Ok(Rotation::Deg90),
        "180" => Ok(Rotation::Deg180),
        "270" => Ok(Rotation::Deg270),
        _ => Err(ErrorString(format!(
            "unknown rotation: {}, possible values: {:?}",
            input,
            Rotation::iter_variants().collect::<Vec<Rotation>>()
        ))),
    }
}

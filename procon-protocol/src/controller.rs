use std::fmt;
use std::str::FromStr;

/// Controller model the engine reports itself as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ControllerType {
    JoyConLeft,
    JoyConRight,
    #[default]
    ProController,
}

impl ControllerType {
    /// Model byte of the device info reply.
    pub fn device_info_byte(self) -> u8 {
        match self {
            ControllerType::JoyConLeft => 0x01,
            ControllerType::JoyConRight => 0x02,
            ControllerType::ProController => 0x03,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ControllerType::JoyConLeft => "joycon-left",
            ControllerType::JoyConRight => "joycon-right",
            ControllerType::ProController => "pro-controller",
        }
    }
}

impl FromStr for ControllerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ControllerType::JoyConLeft,
            ControllerType::JoyConRight,
            ControllerType::ProController,
        ]
        .into_iter()
        .find(|ty| ty.name().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown controller type {s:?}"))
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

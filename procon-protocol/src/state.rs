use crate::{BdAddr, ControllerType, TimingCounter};

pub(crate) const DEFAULT_BATTERY_LEVEL: u8 = 0x90;
pub(crate) const DEFAULT_LEFT_STICK_CENTER: [u8; 3] = [0x6F, 0xC8, 0x77];
pub(crate) const DEFAULT_RIGHT_STICK_CENTER: [u8; 3] = [0x16, 0xD8, 0x7D];
pub(crate) const DEFAULT_BODY_COLOR: [u8; 3] = [0x82; 3];
pub(crate) const DEFAULT_BUTTON_COLOR: [u8; 3] = [0x0F; 3];

/// Values the vibrator byte is resampled from on every acknowledgement.
pub const VIBRATOR_PATTERNS: [u8; 4] = [0xA0, 0xB0, 0xC0, 0x90];

/// Input report mode requested by the host. Recorded only; reports are built
/// the same way in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Unset,
    Standard,
    NfcIr,
    SimpleHid,
}

impl InputMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x30 => Some(InputMode::Standard),
            0x31 => Some(InputMode::NfcIr),
            0x3F => Some(InputMode::SimpleHid),
            _ => None,
        }
    }
}

/// Per-connection emulated controller state.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub address: BdAddr,
    pub controller_type: ControllerType,
    pub device_info_queried: bool,
    pub mode: InputMode,
    /// Player slot, 1 to 4.
    pub player_number: Option<u8>,
    /// Once set, never cleared.
    pub vibration_enabled: bool,
    pub imu_enabled: bool,
    pub battery_level: u8,
    pub connection_info: u8,
    pub button_status: [u8; 3],
    pub left_stick_center: [u8; 3],
    pub right_stick_center: [u8; 3],
    pub vibrator_pattern: u8,
    pub body_color: [u8; 3],
    pub button_color: [u8; 3],
    pub timer: TimingCounter,
}

impl ControllerState {
    pub fn new(address: BdAddr, controller_type: ControllerType, vibrator_pattern: u8) -> Self {
        Self {
            address,
            controller_type,
            device_info_queried: false,
            mode: InputMode::Unset,
            player_number: None,
            vibration_enabled: false,
            imu_enabled: false,
            battery_level: DEFAULT_BATTERY_LEVEL,
            connection_info: 0x00,
            button_status: [0x00; 3],
            left_stick_center: DEFAULT_LEFT_STICK_CENTER,
            right_stick_center: DEFAULT_RIGHT_STICK_CENTER,
            vibrator_pattern,
            body_color: DEFAULT_BODY_COLOR,
            button_color: DEFAULT_BUTTON_COLOR,
            timer: TimingCounter::new(),
        }
    }

    /// Battery level and connection info share one report byte.
    pub fn battery_byte(&self) -> u8 {
        self.battery_level.wrapping_add(self.connection_info)
    }

    pub fn is_pairing_complete(&self) -> bool {
        self.vibration_enabled && self.player_number.is_some()
    }
}

/// Player slot lit by a player-lights bitfield. Both the solid (low nibble)
/// and flashing (high nibble) patterns are recognised.
pub(crate) fn player_from_lights(bitfield: u8) -> Option<u8> {
    match bitfield {
        0x01 | 0x10 => Some(1),
        0x03 | 0x30 => Some(2),
        0x07 | 0x70 => Some(3),
        0x0F | 0xF0 => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_lights() {
        assert_eq!(player_from_lights(0x01), Some(1));
        assert_eq!(player_from_lights(0x30), Some(2));
        assert_eq!(player_from_lights(0x07), Some(3));
        assert_eq!(player_from_lights(0x0F), Some(4));
        assert_eq!(player_from_lights(0xF0), Some(4));
        assert_eq!(player_from_lights(0x05), None);
        assert_eq!(player_from_lights(0x00), None);
    }

    #[test]
    fn test_input_modes() {
        assert_eq!(InputMode::from_raw(0x30), Some(InputMode::Standard));
        assert_eq!(InputMode::from_raw(0x31), Some(InputMode::NfcIr));
        assert_eq!(InputMode::from_raw(0x3F), Some(InputMode::SimpleHid));
        assert_eq!(InputMode::from_raw(0x23), None);
    }

    #[test]
    fn test_defaults() {
        let state = ControllerState::new(
            BdAddr::new([0; 6]),
            ControllerType::ProController,
            VIBRATOR_PATTERNS[0],
        );
        assert_eq!(state.battery_byte(), 0x90);
        assert_eq!(state.body_color, [0x82; 3]);
        assert_eq!(state.button_color, [0x0F; 3]);
        assert!(!state.is_pairing_complete());
    }
}

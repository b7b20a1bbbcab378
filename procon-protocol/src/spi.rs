//! Simulated SPI flash of the controller.
//!
//! Only the regions the console reads while pairing are mapped. Everything
//! else reads back as no data.

use tracing::debug;

use crate::ControllerState;

pub const SERIAL_NUMBER: u16 = 0x6000;
pub const FACTORY_SENSOR_CALIBRATION: u16 = 0x6020;
pub const FACTORY_STICK_CALIBRATION: u16 = 0x603D;
pub const COLORS: u16 = 0x6050;
pub const FACTORY_PARAMETERS: u16 = 0x6080;
pub const RIGHT_STICK_PARAMETERS: u16 = 0x6098;
pub const USER_STICK_CALIBRATION: u16 = 0x8010;

const UNSET: u8 = 0xFF;

const SENSOR_PARAMETERS: [u8; 6] = [0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F];

const STICK_PARAMETERS: [u8; 18] = [
    0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33,
    0x36, 0x63,
];

const LEFT_STICK_CALIBRATION: [u8; 9] = [0xBA, 0xF5, 0x62, 0x6F, 0xC8, 0x77, 0xED, 0x95, 0x5B];
const RIGHT_STICK_CALIBRATION: [u8; 9] = [0x16, 0xD8, 0x7D, 0xF2, 0xB5, 0x5F, 0x86, 0x65, 0x5E];

const SENSOR_CALIBRATION: [u8; 24] = [
    0xD3, 0xFF, 0xD5, 0xFF, 0x55, 0x01, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x19, 0x00, 0xDD, 0xFF,
    0xDC, 0xFF, 0x3B, 0x34, 0x3B, 0x34, 0x3B, 0x34,
];

/// Reads `len` bytes at `addr_high:addr_low`. The result is never longer
/// than requested; unmapped addresses yield an empty buffer.
pub fn read(addr_high: u8, addr_low: u8, len: u8, state: &ControllerState) -> Vec<u8> {
    let address = u16::from_be_bytes([addr_high, addr_low]);

    let mut data = match address {
        SERIAL_NUMBER => vec![UNSET; 16],
        COLORS => [&state.body_color[..], &state.button_color[..], &[UNSET; 7][..]].concat(),
        FACTORY_PARAMETERS => [&SENSOR_PARAMETERS[..], &STICK_PARAMETERS[..]].concat(),
        RIGHT_STICK_PARAMETERS => STICK_PARAMETERS.to_vec(),
        USER_STICK_CALIBRATION => vec![UNSET; 24],
        FACTORY_STICK_CALIBRATION => [
            &LEFT_STICK_CALIBRATION[..],
            &RIGHT_STICK_CALIBRATION[..],
            &[UNSET][..],
            &state.body_color[..],
            &state.button_color[..],
        ]
        .concat(),
        FACTORY_SENSOR_CALIBRATION => SENSOR_CALIBRATION.to_vec(),
        _ => {
            debug!("SPI read of unmapped address 0x{:04X} ({} bytes)", address, len);
            return Vec::new();
        }
    };

    data.truncate(len.into());
    data
}

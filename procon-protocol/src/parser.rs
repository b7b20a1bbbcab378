use nom::bytes::complete::{tag, take};
use nom::combinator::{peek, recognize};
use nom::number::complete::be_u8;
use nom::{IResult, Parser};
use thiserror::Error;

use crate::{COMMAND_FRAME_LEN, COMMAND_SENTINEL};

/// Bytes preceding the subcommand id, sentinel included.
const HEADER_LEN: usize = 11;

/// Why an inbound buffer could not be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no data")]
    NoData,
    #[error("frame too short ({len} bytes)")]
    TooShort { len: usize },
    #[error("malformed frame (leading byte 0x{sentinel:02X})")]
    Malformed { sentinel: u8 },
    #[error("unknown subcommand 0x{0:02X}")]
    UnknownSubcommand(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subcommand {
    RequestDeviceInfo = 0x02,
    SetShipmentMode = 0x08,
    SpiRead = 0x10,
    SetInputReportMode = 0x03,
    TriggerButtonsElapsedTime = 0x04,
    ToggleImu = 0x40,
    EnableVibration = 0x48,
    SetPlayerLights = 0x30,
    SetNfcIrState = 0x22,
    SetNfcIrConfig = 0x21,
}

impl Subcommand {
    pub const ALL: [Subcommand; 10] = [
        Subcommand::RequestDeviceInfo,
        Subcommand::SetShipmentMode,
        Subcommand::SpiRead,
        Subcommand::SetInputReportMode,
        Subcommand::TriggerButtonsElapsedTime,
        Subcommand::ToggleImu,
        Subcommand::EnableVibration,
        Subcommand::SetPlayerLights,
        Subcommand::SetNfcIrState,
        Subcommand::SetNfcIrConfig,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Acknowledgement byte the real controller puts in front of the echoed
    /// subcommand id.
    pub fn ack_byte(self) -> u8 {
        match self {
            Subcommand::RequestDeviceInfo | Subcommand::EnableVibration => 0x82,
            Subcommand::SpiRead => 0x90,
            Subcommand::TriggerButtonsElapsedTime => 0x83,
            Subcommand::SetNfcIrConfig => 0xA0,
            Subcommand::SetShipmentMode
            | Subcommand::SetInputReportMode
            | Subcommand::ToggleImu
            | Subcommand::SetPlayerLights
            | Subcommand::SetNfcIrState => 0x80,
        }
    }
}

impl TryFrom<u8> for Subcommand {
    type Error = ParseError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Subcommand::ALL
            .into_iter()
            .find(|subcommand| subcommand.id() == id)
            .ok_or(ParseError::UnknownSubcommand(id))
    }
}

/// A subcommand together with the arguments the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestDeviceInfo,
    SetShipmentMode,
    SpiRead { addr_low: u8, addr_high: u8, len: u8 },
    SetInputReportMode { mode: u8 },
    TriggerButtonsElapsedTime,
    ToggleImu { enabled: bool },
    EnableVibration,
    SetPlayerLights { bitfield: u8 },
    SetNfcIrState,
    SetNfcIrConfig,
}

/// A classified command frame borrowed from the inbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    header: &'a [u8],
    subcommand: Subcommand,
    payload: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// The fixed header, `raw[..11]`.
    pub fn header(&self) -> &'a [u8] {
        self.header
    }

    pub fn subcommand(&self) -> Subcommand {
        self.subcommand
    }

    /// Subcommand id followed by its arguments, `raw[11..]`.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn command(&self) -> Command {
        match self.subcommand {
            Subcommand::RequestDeviceInfo => Command::RequestDeviceInfo,
            Subcommand::SetShipmentMode => Command::SetShipmentMode,
            Subcommand::SpiRead => Command::SpiRead {
                addr_low: self.arg(1),
                addr_high: self.arg(2),
                len: self.arg(5),
            },
            Subcommand::SetInputReportMode => Command::SetInputReportMode { mode: self.arg(1) },
            Subcommand::TriggerButtonsElapsedTime => Command::TriggerButtonsElapsedTime,
            Subcommand::ToggleImu => Command::ToggleImu {
                enabled: self.arg(1) == 0x01,
            },
            Subcommand::EnableVibration => Command::EnableVibration,
            Subcommand::SetPlayerLights => Command::SetPlayerLights {
                bitfield: self.arg(1),
            },
            Subcommand::SetNfcIrState => Command::SetNfcIrState,
            Subcommand::SetNfcIrConfig => Command::SetNfcIrConfig,
        }
    }

    // parse() only hands out frames of COMMAND_FRAME_LEN bytes or more, so
    // every argument index the commands use is present
    fn arg(&self, index: usize) -> u8 {
        self.payload.get(index).copied().unwrap_or_default()
    }
}

fn tag_command(i: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&[COMMAND_SENTINEL][..]).parse(i)
}

fn command_header(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize((tag_command, take(HEADER_LEN - 1))).parse(i)
}

fn subcommand_id(i: &[u8]) -> IResult<&[u8], u8> {
    peek(be_u8).parse(i)
}

/// Classifies a raw inbound buffer. `None` and empty buffers both count as
/// "no data".
pub fn parse(raw: Option<&[u8]>) -> Result<CommandFrame<'_>, ParseError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ParseError::NoData),
    };

    if raw.len() < COMMAND_FRAME_LEN {
        return Err(ParseError::TooShort { len: raw.len() });
    }

    let (payload, header) = command_header(raw).map_err(|_| ParseError::Malformed {
        sentinel: raw[0],
    })?;
    let (_, id) =
        subcommand_id(payload).map_err(|_| ParseError::TooShort { len: raw.len() })?;
    let subcommand = Subcommand::try_from(id)?;

    Ok(CommandFrame {
        header,
        subcommand,
        payload,
    })
}

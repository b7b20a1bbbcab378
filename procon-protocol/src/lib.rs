//! Protocol engine for an emulated Pro Controller.
//!
//! The host sends command frames starting with [`COMMAND_SENTINEL`]; the
//! [`Engine`] decodes them, updates the emulated accessory state and builds
//! the next outbound [`Report`], which always starts with [`REPORT_SENTINEL`].

pub const COMMAND_SENTINEL: u8 = 0xA2;
pub const REPORT_SENTINEL: u8 = 0xA1;
pub const COMMAND_FRAME_LEN: usize = 50;
pub const DEFAULT_REPORT_SIZE: usize = 50;

pub use address::{AddressError, BdAddr};
pub use controller::ControllerType;
pub use dump::{Direction, Dump};
pub use engine::{ConfigError, Engine, GetReportError, Identity};
pub use parser::{parse, Command, CommandFrame, ParseError, Subcommand};
pub use report::{Report, ReportKind};
pub use state::{ControllerState, InputMode};
pub use timer::TimingCounter;

pub mod descriptor;
pub mod spi;

mod address;
mod controller;
mod dump;
mod engine;
mod parser;
mod report;
mod state;
mod timer;

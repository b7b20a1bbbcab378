use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::parser::{self, Command, CommandFrame, ParseError, Subcommand};
use crate::report::{self, Report, ReportKind};
use crate::state::{self, ControllerState, InputMode, VIBRATOR_PATTERNS};
use crate::{descriptor, spi, AddressError, BdAddr, ControllerType};

const FIRMWARE_VERSION: [u8; 2] = [0x03, 0x8B];
const DEVICE_INFO_UNKNOWN: u8 = 0x02;
/// "Use colours from SPI" and the trailing flag of the device info reply.
const DEVICE_INFO_FLAGS: [u8; 2] = [0x01, 0x01];

const SPI_ADDR_LOW: usize = 16;
const SPI_ADDR_HIGH: usize = 17;
const SPI_LEN: usize = 20;
const SPI_DATA: usize = 21;

const NFC_IR_CONFIG: [u8; 8] = [0x01, 0x00, 0xFF, 0x00, 0x08, 0x00, 0x1B, 0x01];
const NFC_IR_CONFIG_TRAILER: usize = 49;
const NFC_IR_CONFIG_TRAILER_BYTE: u8 = 0xC8;

/// Three canned accelerometer/gyroscope samples, 12 bytes each.
#[rustfmt::skip]
const IMU_SAMPLE: [u8; 36] = [
    0x75, 0xFD, 0xFD, 0xFF, 0x09, 0x10, 0x21, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
    0x72, 0xFD, 0xF9, 0xFF, 0x0A, 0x10, 0x22, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
    0x76, 0xFD, 0xFC, 0xFF, 0x09, 0x10, 0x23, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid controller address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("unsupported report size {size} (supported: {min}..={max})")]
    UnsupportedReportSize { size: usize, min: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GetReportError {
    #[error("input report 0x{0:02X} not found")]
    ReportIdNotFound(u8),
}

/// Who the engine claims to be, validated up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    address: BdAddr,
    controller_type: ControllerType,
    report_size: usize,
}

impl Identity {
    pub fn new(
        address: BdAddr,
        controller_type: ControllerType,
        report_size: usize,
    ) -> Result<Self, ConfigError> {
        let supported = descriptor::supported_report_sizes();
        if !supported.contains(&report_size) {
            return Err(ConfigError::UnsupportedReportSize {
                size: report_size,
                min: *supported.start(),
                max: *supported.end(),
            });
        }

        Ok(Self {
            address,
            controller_type,
            report_size,
        })
    }

    /// Parses the colon-separated link address, e.g. `98:B6:E9:12:34:57`.
    pub fn parse(
        address: &str,
        controller_type: ControllerType,
        report_size: usize,
    ) -> Result<Self, ConfigError> {
        Self::new(address.parse()?, controller_type, report_size)
    }

    pub fn address(&self) -> BdAddr {
        self.address
    }

    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    pub fn report_size(&self) -> usize {
        self.report_size
    }
}

/// Stateful request/response engine for one host connection.
///
/// Every [`on_tick`](Engine::on_tick) builds exactly one report, which the
/// caller then takes with [`outgoing_report`](Engine::outgoing_report). The
/// engine is not thread-safe; it is owned by whatever drives the connection.
pub struct Engine<R = StdRng> {
    identity: Identity,
    state: ControllerState,
    report: Report,
    pending: bool,
    rng: R,
}

impl Engine<StdRng> {
    pub fn new(identity: Identity) -> Self {
        Self::with_rng(identity, StdRng::from_os_rng())
    }
}

impl<R: Rng> Engine<R> {
    /// Builds an engine drawing vibrator patterns from `rng`.
    pub fn with_rng(identity: Identity, mut rng: R) -> Self {
        let vibrator_pattern = pick_vibrator_pattern(&mut rng);
        Self {
            state: ControllerState::new(
                identity.address,
                identity.controller_type,
                vibrator_pattern,
            ),
            report: Report::empty(identity.report_size),
            pending: false,
            identity,
            rng,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Vibration enabled and a player slot assigned. Never reverts.
    pub fn is_pairing_complete(&self) -> bool {
        self.state.is_pairing_complete()
    }

    /// Whether a report was built since the last hand-off.
    pub fn has_pending_report(&self) -> bool {
        self.pending
    }

    pub fn set_buttons(&mut self, buttons: [u8; 3]) {
        self.state.button_status = buttons;
    }

    pub fn set_left_stick(&mut self, stick: [u8; 3]) {
        self.state.left_stick_center = stick;
    }

    pub fn set_right_stick(&mut self, stick: [u8; 3]) {
        self.state.right_stick_center = stick;
    }

    pub fn set_colors(&mut self, body: [u8; 3], buttons: [u8; 3]) {
        self.state.body_color = body;
        self.state.button_color = buttons;
    }

    /// Processes zero or one inbound frame and builds the next report.
    /// Anything that is not a recognised command frame is answered with a
    /// full report.
    pub fn on_tick(&mut self, raw: Option<&[u8]>) {
        match parser::parse(raw) {
            Ok(frame) => self.dispatch(&frame),
            Err(ParseError::NoData) => self.full_report(),
            Err(err) => {
                debug!("Answering unusable frame with a full report: {}", err);
                self.full_report();
            }
        }
        self.pending = true;
    }

    /// Hands out the current report and starts over from an empty one.
    ///
    /// Call once per tick: a second call returns the sentinel-only template.
    pub fn outgoing_report(&mut self) -> Report {
        if !self.pending {
            warn!("Outgoing report requested without a preceding tick, sending an empty report");
        }
        self.pending = false;
        std::mem::replace(&mut self.report, Report::empty(self.identity.report_size))
    }

    /// Answers a GET_REPORT request for an input report. The returned data
    /// omits the transaction header byte and is cut to `buffer_size - 1`
    /// bytes when the host gave a buffer size.
    pub fn get_input_report(
        &mut self,
        report_id: u8,
        buffer_size: usize,
    ) -> Result<Vec<u8>, GetReportError> {
        match report_id {
            id if id == ReportKind::SubcommandReply.id() => self.subcommand_reply(),
            id if id == ReportKind::Full.id() => self.full_report(),
            id => return Err(GetReportError::ReportIdNotFound(id)),
        }
        self.pending = true;

        let mut data = self.outgoing_report().into_bytes().split_off(1);
        if buffer_size > 0 {
            data.truncate(buffer_size - 1);
        }
        Ok(data)
    }

    fn dispatch(&mut self, frame: &CommandFrame<'_>) {
        let subcommand = frame.subcommand();
        let command = frame.command();
        let was_paired = self.is_pairing_complete();
        debug!("Dispatching {:?}", command);

        if command == Command::RequestDeviceInfo {
            self.state.device_info_queried = true;
        }
        self.acknowledge(subcommand);

        match command {
            Command::RequestDeviceInfo => self.write_device_info(),
            Command::SpiRead {
                addr_low,
                addr_high,
                len,
            } => {
                self.report.put(SPI_ADDR_LOW, addr_low);
                self.report.put(SPI_ADDR_HIGH, addr_high);
                self.report.put(SPI_LEN, len);
                let data = spi::read(addr_high, addr_low, len, &self.state);
                self.report.put_slice(SPI_DATA, &data);
            }
            Command::SetInputReportMode { mode } => match InputMode::from_raw(mode) {
                Some(mode) => self.state.mode = mode,
                None => debug!("Ignoring unknown input report mode 0x{:02X}", mode),
            },
            Command::ToggleImu { enabled } => self.state.imu_enabled = enabled,
            Command::EnableVibration => self.state.vibration_enabled = true,
            Command::SetPlayerLights { bitfield } => {
                match state::player_from_lights(bitfield) {
                    Some(player) => self.state.player_number = Some(player),
                    None => debug!("Ignoring unmapped player lights 0x{:02X}", bitfield),
                }
            }
            Command::SetNfcIrConfig => {
                self.report.put_slice(report::REPLY_DATA, &NFC_IR_CONFIG);
                self.report
                    .put(NFC_IR_CONFIG_TRAILER, NFC_IR_CONFIG_TRAILER_BYTE);
            }
            // elapsed time of the trigger buttons is not tracked
            Command::SetShipmentMode
            | Command::TriggerButtonsElapsedTime
            | Command::SetNfcIrState => {}
        }

        if !was_paired && self.is_pairing_complete() {
            info!(
                "Pairing complete (player {})",
                self.state.player_number.unwrap_or_default()
            );
        }
    }

    fn acknowledge(&mut self, subcommand: Subcommand) {
        self.subcommand_reply();
        self.report
            .put_slice(report::ACK, &[subcommand.ack_byte(), subcommand.id()]);
    }

    fn subcommand_reply(&mut self) {
        self.report.set_kind(ReportKind::SubcommandReply);
        self.state.vibrator_pattern = pick_vibrator_pattern(&mut self.rng);
        self.write_standard_fields();
    }

    fn full_report(&mut self) {
        self.report.set_kind(ReportKind::Full);
        self.write_standard_fields();
        if self.state.imu_enabled {
            self.report.put_slice(report::IMU, &IMU_SAMPLE);
        }
    }

    fn write_standard_fields(&mut self) {
        let timer = self.state.timer.tick();
        self.report.put(report::TIMER, timer);

        if !self.state.device_info_queried {
            trace!("Device info not queried yet, leaving input fields empty");
            return;
        }

        self.report.put(report::BATTERY, self.state.battery_byte());
        self.report.put_slice(report::BUTTONS, &self.state.button_status);
        self.report
            .put_slice(report::LEFT_STICK, &self.state.left_stick_center);
        self.report
            .put_slice(report::RIGHT_STICK, &self.state.right_stick_center);
        self.report.put(report::VIBRATOR, self.state.vibrator_pattern);
    }

    fn write_device_info(&mut self) {
        let offset = report::REPLY_DATA;
        self.report.put_slice(offset, &FIRMWARE_VERSION);
        self.report
            .put(offset + 2, self.identity.controller_type.device_info_byte());
        self.report.put(offset + 3, DEVICE_INFO_UNKNOWN);
        self.report
            .put_slice(offset + 4, &self.identity.address.octets());
        self.report.put_slice(offset + 10, &DEVICE_INFO_FLAGS);
    }
}

fn pick_vibrator_pattern<R: Rng>(rng: &mut R) -> u8 {
    VIBRATOR_PATTERNS
        .choose(rng)
        .copied()
        .unwrap_or(VIBRATOR_PATTERNS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COMMAND_FRAME_LEN, COMMAND_SENTINEL, DEFAULT_REPORT_SIZE, REPORT_SENTINEL};

    const ADDRESS: &str = "98:B6:E9:12:34:57";

    fn engine() -> Engine {
        engine_with_seed(42)
    }

    fn engine_with_seed(seed: u64) -> Engine {
        let identity =
            Identity::parse(ADDRESS, ControllerType::ProController, DEFAULT_REPORT_SIZE)
                .expect("valid identity");
        Engine::with_rng(identity, StdRng::seed_from_u64(seed))
    }

    fn frame(subcommand: u8, args: &[u8]) -> Vec<u8> {
        let mut raw = vec![0u8; COMMAND_FRAME_LEN];
        raw[0] = COMMAND_SENTINEL;
        raw[11] = subcommand;
        raw[12..12 + args.len()].copy_from_slice(args);
        raw
    }

    fn send(engine: &mut Engine, subcommand: u8, args: &[u8]) -> Vec<u8> {
        engine.on_tick(Some(&frame(subcommand, args)[..]));
        engine.outgoing_report().into_bytes()
    }

    #[test]
    fn test_rejects_bad_identity() {
        assert!(matches!(
            Identity::parse("98:B6:E9", ControllerType::ProController, 50),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert_eq!(
            Identity::parse(ADDRESS, ControllerType::ProController, 49),
            Err(ConfigError::UnsupportedReportSize {
                size: 49,
                min: 50,
                max: 104
            })
        );
        assert!(Identity::parse(ADDRESS, ControllerType::ProController, 105).is_err());
        assert!(Identity::parse(ADDRESS, ControllerType::ProController, 104).is_ok());
    }

    #[test]
    fn test_device_info() {
        let mut engine = engine();
        assert!(!engine.state().device_info_queried);

        let report = send(&mut engine, 0x02, &[]);
        assert!(engine.state().device_info_queried);
        assert_eq!(report[0], REPORT_SENTINEL);
        assert_eq!(report[1], 0x21);
        assert_eq!(
            &report[14..20],
            &[0x82, 0x02, 0x03, 0x8B, 0x03, 0x02]
        );
        assert_eq!(&report[20..26], &[0x98, 0xB6, 0xE9, 0x12, 0x34, 0x57]);
        assert_eq!(&report[26..28], &[0x01, 0x01]);

        // input fields are populated as soon as device info was queried
        assert_eq!(report[3], 0x90);
        assert_eq!(&report[7..10], &[0x6F, 0xC8, 0x77]);
        assert_eq!(&report[10..13], &[0x16, 0xD8, 0x7D]);
        assert!(VIBRATOR_PATTERNS.contains(&report[13]));
    }

    #[test]
    fn test_device_info_controller_type() -> Result<(), ConfigError> {
        let identity = Identity::parse(ADDRESS, ControllerType::JoyConLeft, 50)?;
        let mut engine = Engine::with_rng(identity, StdRng::seed_from_u64(1));
        engine.on_tick(Some(&frame(0x02, &[])[..]));

        assert_eq!(engine.outgoing_report().as_bytes()[18], 0x01);
        Ok(())
    }

    #[test]
    fn test_input_fields_empty_before_device_info() {
        let mut engine = engine();
        let report = send(&mut engine, 0x08, &[]);

        assert_eq!(report[1], 0x21);
        assert_eq!(&report[3..14], &[0u8; 11]);
        assert_eq!(&report[14..16], &[0x80, 0x08]);
    }

    #[test]
    fn test_acknowledgement_markers() {
        let cases: [(u8, &[u8], [u8; 2]); 9] = [
            (0x08, &[], [0x80, 0x08]),
            (0x10, &[0x00, 0x60, 0x00, 0x00, 0x10], [0x90, 0x10]),
            (0x03, &[0x30], [0x80, 0x03]),
            (0x04, &[], [0x83, 0x04]),
            (0x40, &[0x01], [0x80, 0x40]),
            (0x48, &[0x01], [0x82, 0x48]),
            (0x30, &[0x01], [0x80, 0x30]),
            (0x22, &[0x01], [0x80, 0x22]),
            (0x21, &[0x21], [0xA0, 0x21]),
        ];

        for (subcommand, args, marker) in cases {
            let mut engine = engine();
            let report = send(&mut engine, subcommand, args);
            assert_eq!(report[1], 0x21, "subcommand 0x{subcommand:02X}");
            assert_eq!(&report[14..16], &marker, "subcommand 0x{subcommand:02X}");
        }
    }

    #[test]
    fn test_spi_read() {
        let mut engine = engine();
        let report = send(&mut engine, 0x10, &[0x50, 0x60, 0x00, 0x00, 0x0D]);

        assert_eq!(report[16], 0x50);
        assert_eq!(report[17], 0x60);
        assert_eq!(report[20], 0x0D);
        assert_eq!(
            &report[21..34],
            &[0x82, 0x82, 0x82, 0x0F, 0x0F, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(&report[34..], &[0u8; 16]);
    }

    #[test]
    fn test_spi_read_uses_live_colors() {
        let mut engine = engine();
        engine.set_colors([0x01, 0x02, 0x03], [0x04, 0x05, 0x06]);
        let report = send(&mut engine, 0x10, &[0x3D, 0x60, 0x00, 0x00, 0x19]);

        assert_eq!(report[39], 0xFF);
        assert_eq!(&report[40..46], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_spi_read_unmapped_leaves_zeros() {
        let mut engine = engine();
        let report = send(&mut engine, 0x10, &[0x00, 0x20, 0x00, 0x00, 0x10]);

        assert_eq!(report[16], 0x00);
        assert_eq!(report[17], 0x20);
        assert_eq!(report[20], 0x10);
        assert_eq!(&report[21..], &[0u8; 29]);
    }

    #[test]
    fn test_set_input_report_mode() {
        let mut engine = engine();
        send(&mut engine, 0x03, &[0x31]);
        assert_eq!(engine.state().mode, InputMode::NfcIr);

        send(&mut engine, 0x03, &[0x3F]);
        assert_eq!(engine.state().mode, InputMode::SimpleHid);

        send(&mut engine, 0x03, &[0x55]);
        assert_eq!(engine.state().mode, InputMode::SimpleHid);

        send(&mut engine, 0x03, &[0x30]);
        assert_eq!(engine.state().mode, InputMode::Standard);
    }

    #[test]
    fn test_nfc_ir_config() {
        let mut engine = engine();
        let report = send(&mut engine, 0x21, &[0x21]);

        assert_eq!(&report[16..24], &NFC_IR_CONFIG);
        assert_eq!(report[49], 0xC8);
    }

    #[test]
    fn test_player_lights() {
        let mut engine = engine();
        send(&mut engine, 0x30, &[0x05]);
        assert_eq!(engine.state().player_number, None);

        send(&mut engine, 0x30, &[0x01]);
        assert_eq!(engine.state().player_number, Some(1));

        send(&mut engine, 0x30, &[0x05]);
        assert_eq!(engine.state().player_number, Some(1));

        send(&mut engine, 0x30, &[0x0F]);
        assert_eq!(engine.state().player_number, Some(4));
    }

    #[test]
    fn test_pairing_complete_in_either_order() {
        let mut engine = engine();
        assert!(!engine.is_pairing_complete());
        send(&mut engine, 0x48, &[0x01]);
        assert!(!engine.is_pairing_complete());
        send(&mut engine, 0x30, &[0x01]);
        assert!(engine.is_pairing_complete());

        let mut engine = engine_with_seed(3);
        send(&mut engine, 0x30, &[0x03]);
        assert!(!engine.is_pairing_complete());
        send(&mut engine, 0x48, &[0x01]);
        assert!(engine.is_pairing_complete());

        // nothing the host sends afterwards undoes it
        send(&mut engine, 0x48, &[0x00]);
        send(&mut engine, 0x30, &[0x00]);
        send(&mut engine, 0x40, &[0x00]);
        engine.on_tick(None);
        engine.outgoing_report();
        assert!(engine.is_pairing_complete());
    }

    #[test]
    fn test_full_report_on_bad_input() {
        let bad: [Option<&[u8]>; 4] = [
            None,
            Some(&[0xA2, 0x00, 0x00][..]),
            Some(&[0u8; 50][..]),
            Some(&[0xA2; 50][..]),
        ];

        for raw in bad {
            let mut engine = engine();
            engine.on_tick(raw);
            let report = engine.outgoing_report();
            assert_eq!(report.kind(), Some(ReportKind::Full));
            assert_eq!(&report.as_bytes()[3..], &[0u8; 47]);
        }
    }

    #[test]
    fn test_full_report_with_device_info() {
        let mut engine = engine();
        send(&mut engine, 0x02, &[]);
        engine.set_buttons([0x01, 0x02, 0x04]);
        engine.set_left_stick([0x00, 0x08, 0x80]);
        engine.set_right_stick([0x00, 0x08, 0x81]);

        engine.on_tick(None);
        let report = engine.outgoing_report().into_bytes();
        assert_eq!(report[1], 0x30);
        assert_eq!(report[3], 0x90);
        assert_eq!(&report[4..13], &[0x01, 0x02, 0x04, 0x00, 0x08, 0x80, 0x00, 0x08, 0x81]);
        assert!(VIBRATOR_PATTERNS.contains(&report[13]));
        assert_eq!(&report[14..], &[0u8; 36]);
    }

    #[test]
    fn test_imu_only_in_full_reports() {
        let mut engine = engine();
        let ack = send(&mut engine, 0x40, &[0x01]);
        assert!(engine.state().imu_enabled);
        assert_eq!(&ack[16..], &[0u8; 34]);

        engine.on_tick(None);
        let full = engine.outgoing_report().into_bytes();
        assert_eq!(&full[14..50], &IMU_SAMPLE);

        send(&mut engine, 0x40, &[0x00]);
        assert!(!engine.state().imu_enabled);
        engine.on_tick(None);
        let full = engine.outgoing_report().into_bytes();
        assert_eq!(&full[14..], &[0u8; 36]);
    }

    #[test]
    fn test_vibrator_pattern_is_resampled_deterministically() {
        let mut a = engine_with_seed(9);
        let mut b = engine_with_seed(9);
        send(&mut a, 0x02, &[]);
        send(&mut b, 0x02, &[]);

        for _ in 0..16 {
            let ra = send(&mut a, 0x08, &[]);
            let rb = send(&mut b, 0x08, &[]);
            assert_eq!(ra[13], rb[13]);
            assert!(VIBRATOR_PATTERNS.contains(&ra[13]));
        }
    }

    #[test]
    fn test_outgoing_report_clears_on_read() {
        let mut engine = engine();
        engine.on_tick(Some(&frame(0x02, &[])[..]));
        assert!(engine.has_pending_report());

        let first = engine.outgoing_report();
        assert!(!first.is_template());
        assert!(!engine.has_pending_report());

        let second = engine.outgoing_report();
        assert!(second.is_template());
        assert_eq!(second.len(), 50);
        assert_eq!(second.as_bytes()[0], REPORT_SENTINEL);
    }

    #[test]
    fn test_get_input_report() {
        let mut engine = engine();
        assert_eq!(
            engine.get_input_report(0x3F, 0),
            Err(GetReportError::ReportIdNotFound(0x3F))
        );

        let reply = engine.get_input_report(0x21, 0).expect("reply");
        assert_eq!(reply.len(), 49);
        assert_eq!(reply[0], 0x21);

        let full = engine.get_input_report(0x30, 20).expect("full");
        assert_eq!(full.len(), 19);
        assert_eq!(full[0], 0x30);
        assert!(!engine.has_pending_report());
    }
}

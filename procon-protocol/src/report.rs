use tracing::trace;

use crate::REPORT_SENTINEL;

pub(crate) const KIND: usize = 1;
pub(crate) const TIMER: usize = 2;
pub(crate) const BATTERY: usize = 3;
pub(crate) const BUTTONS: usize = 4;
pub(crate) const LEFT_STICK: usize = 7;
pub(crate) const RIGHT_STICK: usize = 10;
pub(crate) const VIBRATOR: usize = 13;
pub(crate) const ACK: usize = 14;
pub(crate) const REPLY_DATA: usize = 16;
pub(crate) const IMU: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReportKind {
    SubcommandReply = 0x21,
    Full = 0x30,
}

impl ReportKind {
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Outbound report buffer. Freshly built reports are zeroed apart from the
/// sentinel; writes past the end are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    bytes: Vec<u8>,
}

impl Report {
    pub fn empty(size: usize) -> Self {
        let mut bytes = vec![0u8; size];
        if let Some(sentinel) = bytes.first_mut() {
            *sentinel = REPORT_SENTINEL;
        }
        Self { bytes }
    }

    pub fn kind(&self) -> Option<ReportKind> {
        match self.bytes.get(KIND) {
            Some(0x21) => Some(ReportKind::SubcommandReply),
            Some(0x30) => Some(ReportKind::Full),
            _ => None,
        }
    }

    /// True when nothing but the sentinel has been written.
    pub fn is_template(&self) -> bool {
        self.bytes.get(1..).is_some_and(|rest| rest.iter().all(|b| *b == 0))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn set_kind(&mut self, kind: ReportKind) {
        self.put(KIND, kind.id());
    }

    pub(crate) fn put(&mut self, offset: usize, byte: u8) {
        self.put_slice(offset, &[byte]);
    }

    pub(crate) fn put_slice(&mut self, offset: usize, data: &[u8]) {
        let end = offset.saturating_add(data.len()).min(self.bytes.len());
        let Some(dst) = self.bytes.get_mut(offset..end) else {
            trace!("Dropping {} byte(s) written past the report end", data.len());
            return;
        };
        let written = dst.len();
        dst.copy_from_slice(&data[..written]);
        if written < data.len() {
            trace!(
                "Truncated write at offset {}: {} of {} byte(s) fit",
                offset,
                written,
                data.len()
            );
        }
    }
}

impl AsRef<[u8]> for Report {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

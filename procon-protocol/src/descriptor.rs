//! HID report descriptor advertised for the emulated gamepad.

use std::ops::RangeInclusive;

use crate::ReportKind;

#[rustfmt::skip]
pub const HID_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x05,       // Usage (Game Pad)
    0xA1, 0x01,       // Collection (Application)
    0x06, 0x01, 0xFF, //   Usage Page (Vendor Defined 0xFF01)

    0x85, 0x21, 0x09, 0x21, 0x75, 0x08, 0x95, 0x30, 0x81, 0x02, // report 0x21, 48 bytes in
    0x85, 0x30, 0x09, 0x30, 0x75, 0x08, 0x95, 0x30, 0x81, 0x02, // report 0x30, 48 bytes in
    0x85, 0x31, 0x09, 0x31, 0x75, 0x08, 0x95, 0x66, 0x81, 0x02, // report 0x31, 102 bytes in
    0x85, 0x32, 0x09, 0x32, 0x75, 0x08, 0x95, 0x66, 0x81, 0x02, // report 0x32, 102 bytes in
    0x85, 0x33, 0x09, 0x33, 0x75, 0x08, 0x95, 0x66, 0x81, 0x02, // report 0x33, 102 bytes in

    0x85, 0x3F,       //   Report ID (0x3F), simple HID
    0x05, 0x09,       //   Usage Page (Button)
    0x19, 0x01,       //   Usage Minimum (1)
    0x29, 0x10,       //   Usage Maximum (16)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x10,       //   Report Count (16)
    0x81, 0x02,       //   Input (Data,Var,Abs)
    0x05, 0x01,       //   Usage Page (Generic Desktop)
    0x09, 0x39,       //   Usage (Hat switch)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x07,       //   Logical Maximum (7)
    0x75, 0x04,       //   Report Size (4)
    0x95, 0x01,       //   Report Count (1)
    0x81, 0x42,       //   Input (Data,Var,Abs,Null State)
    0x05, 0x09,       //   Usage Page (Button)
    0x75, 0x04,       //   Report Size (4)
    0x95, 0x01,       //   Report Count (1)
    0x81, 0x01,       //   Input (Constant)
    0x05, 0x01,       //   Usage Page (Generic Desktop)
    0x09, 0x30,       //   Usage (X)
    0x09, 0x31,       //   Usage (Y)
    0x09, 0x33,       //   Usage (Rx)
    0x09, 0x34,       //   Usage (Ry)
    0x16, 0x00, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0xFF, //   Logical Maximum (65535)
    0x75, 0x10,       //   Report Size (16)
    0x95, 0x04,       //   Report Count (4)
    0x81, 0x02,       //   Input (Data,Var,Abs)

    0x06, 0x01, 0xFF, //   Usage Page (Vendor Defined 0xFF01)
    0x85, 0x01, 0x09, 0x01, 0x75, 0x08, 0x95, 0x30, 0x91, 0x02, // report 0x01, 48 bytes out
    0x85, 0x10, 0x09, 0x10, 0x75, 0x08, 0x95, 0x30, 0x91, 0x02, // report 0x10, 48 bytes out
    0x85, 0x11, 0x09, 0x11, 0x75, 0x08, 0x95, 0x30, 0x91, 0x02, // report 0x11, 48 bytes out
    0x85, 0x12, 0x09, 0x12, 0x75, 0x08, 0x95, 0x30, 0x91, 0x02, // report 0x12, 48 bytes out
    0xC0,             // End Collection
];

// short item prefixes with the size bits masked off
const ITEM_INPUT: u8 = 0x80;
const ITEM_REPORT_SIZE: u8 = 0x74;
const ITEM_REPORT_ID: u8 = 0x84;
const ITEM_REPORT_COUNT: u8 = 0x94;

/// Bytes an outbound report carries besides the descriptor's payload: the
/// transaction header and the report id.
const REPORT_OVERHEAD: usize = 2;

/// Payload length in bytes of every input report the descriptor declares,
/// in declaration order.
pub fn input_report_lengths() -> Vec<(u8, usize)> {
    let mut bits: Vec<(u8, usize)> = Vec::new();
    let mut report_id = 0u8;
    let mut report_size = 0usize;
    let mut report_count = 0usize;

    let mut items = HID_REPORT_DESCRIPTOR.iter().copied();
    while let Some(prefix) = items.next() {
        let len = match prefix & 0x03 {
            3 => 4,
            n => usize::from(n),
        };
        let value = items
            .by_ref()
            .take(len)
            .enumerate()
            .fold(0u32, |acc, (i, b)| acc | (u32::from(b) << (8 * i)));

        match prefix & 0xFC {
            ITEM_REPORT_ID => report_id = value as u8,
            ITEM_REPORT_SIZE => report_size = value as usize,
            ITEM_REPORT_COUNT => report_count = value as usize,
            ITEM_INPUT => {
                let field = report_size * report_count;
                match bits.iter_mut().find(|(id, _)| *id == report_id) {
                    Some((_, total)) => *total += field,
                    None => bits.push((report_id, field)),
                }
            }
            _ => {}
        }
    }

    bits.into_iter()
        .map(|(id, bits)| (id, bits.div_ceil(8)))
        .collect()
}

pub fn input_report_len(report_id: u8) -> Option<usize> {
    input_report_lengths()
        .into_iter()
        .find(|(id, _)| *id == report_id)
        .map(|(_, len)| len)
}

/// Outbound report sizes the engine can build: large enough for a full
/// report, no larger than the biggest input report.
pub fn supported_report_sizes() -> RangeInclusive<usize> {
    let lengths = input_report_lengths();
    let full = lengths
        .iter()
        .find(|(id, _)| *id == ReportKind::Full.id())
        .map_or(0, |(_, len)| *len);
    let largest = lengths.iter().map(|(_, len)| *len).max().unwrap_or(full);

    (full + REPORT_OVERHEAD)..=(largest + REPORT_OVERHEAD)
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use procon_protocol::parse;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = parse(Some(data)) {
        let _ = frame.command();
    }
});

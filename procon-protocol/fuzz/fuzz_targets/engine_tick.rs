#![no_main]

use libfuzzer_sys::fuzz_target;
use procon_protocol::{ControllerType, Engine, Identity, DEFAULT_REPORT_SIZE, REPORT_SENTINEL};
use rand::rngs::StdRng;
use rand::SeedableRng;

fuzz_target!(|data: &[u8]| {
    let Ok(identity) = Identity::parse(
        "98:B6:E9:12:34:57",
        ControllerType::ProController,
        DEFAULT_REPORT_SIZE,
    ) else {
        return;
    };
    let mut engine = Engine::with_rng(identity, StdRng::seed_from_u64(0));

    for chunk in data.chunks(50) {
        engine.on_tick(Some(chunk));
        let report = engine.outgoing_report();
        assert_eq!(report.len(), DEFAULT_REPORT_SIZE);
        assert_eq!(report.as_bytes()[0], REPORT_SENTINEL);
    }
});

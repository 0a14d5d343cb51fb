//! Region tables loaded from JSON.

#![cfg(feature = "serde")]

use emu_core::Tickable;
use ricoh_apu_2a03::{Apu, FrameTiming, TimingError};

const FAST_REGION: &str = r#"{
    "four_step": { "steps": [10, 20, 30], "irq_start": 38, "clock": 39, "wrap": 40 },
    "five_step": { "steps": [10, 20, 30, 39], "clock": 49, "wrap": 50 }
}"#;

#[test]
fn custom_region_drives_the_sequencer() {
    let timing: FrameTiming = serde_json::from_str(FAST_REGION).expect("valid JSON");
    timing.validate().expect("valid table");

    let mut apu = Apu::new(timing);
    for _ in 0..37 {
        apu.tick();
    }
    assert!(!apu.irq_pending());
    apu.tick();
    assert!(apu.irq_pending());
}

#[test]
fn builtin_tables_round_trip() {
    let json = serde_json::to_string(&FrameTiming::PAL).expect("serialises");
    let back: FrameTiming = serde_json::from_str(&json).expect("deserialises");
    assert_eq!(back, FrameTiming::PAL);
}

#[test]
fn out_of_order_table_is_rejected() {
    let json = FAST_REGION.replace("[10, 20, 30, 39]", "[10, 30, 20, 39]");
    let timing: FrameTiming = serde_json::from_str(&json).expect("valid JSON");
    assert!(matches!(
        timing.validate(),
        Err(TimingError::NotIncreasing { index: 2, .. })
    ));
}

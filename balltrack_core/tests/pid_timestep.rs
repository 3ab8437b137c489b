//! Fixed vs measured controller timestep, driven through the firmware with
//! irregular tick spacing.

use std::sync::Arc;

use balltrack_core::frame::encode;
use balltrack_core::mocks::{ConstSensor, SpyServo};
use balltrack_core::{ControlCfg, Firmware, FirmwareBuilder, FirmwareCfg, PowerLaw, Timestep};
use balltrack_traits::clock::test_clock::ManualClock;

fn booted(timestep: Timestep) -> (Firmware<ConstSensor, SpyServo>, ManualClock) {
    let clock = ManualClock::new();
    let cfg = FirmwareCfg {
        control: ControlCfg {
            timestep,
            ..ControlCfg::default()
        },
        ..FirmwareCfg::default()
    };
    let mut fw = FirmwareBuilder::new()
        .with_sensor(ConstSensor(300))
        .with_servo(SpyServo::default())
        .with_config(cfg)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let mut out = Vec::new();
    fw.boot(&mut out);
    fw.feed(format!("{}\n", encode("TEST")).as_bytes(), &mut out);
    (fw, clock)
}

fn tick_after(fw: &mut Firmware<ConstSensor, SpyServo>, clock: &ManualClock, ms: u64) {
    clock.advance_ms(ms);
    let mut out = Vec::new();
    assert!(fw.poll(&mut out));
}

fn error() -> f32 {
    PowerLaw::default().to_cm(300.0) - 20.0
}

#[test]
fn fixed_timestep_integrates_nominal_period() {
    let (mut fw, clock) = booted(Timestep::Fixed);
    tick_after(&mut fw, &clock, 100);
    tick_after(&mut fw, &clock, 250);
    let expected = error() * 0.1 + error() * 0.1;
    assert!((fw.pid().integral() - expected).abs() < 1e-4);
}

#[test]
fn measured_timestep_integrates_elapsed_time() {
    let (mut fw, clock) = booted(Timestep::Measured);
    // First update after a reset falls back to the nominal period.
    tick_after(&mut fw, &clock, 100);
    tick_after(&mut fw, &clock, 250);
    let expected = error() * 0.1 + error() * 0.25;
    assert!((fw.pid().integral() - expected).abs() < 1e-4);
}

#[test]
fn measured_timestep_restarts_after_target() {
    let (mut fw, clock) = booted(Timestep::Measured);
    tick_after(&mut fw, &clock, 100);
    let mut out = Vec::new();
    fw.feed(format!("{}\n", encode("TARGET(20)")).as_bytes(), &mut out);
    assert_eq!(fw.pid().integral(), 0.0);
    tick_after(&mut fw, &clock, 400);
    assert!((fw.pid().integral() - error() * 0.1).abs() < 1e-4);
}

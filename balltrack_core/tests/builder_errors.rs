use balltrack_core::mocks::{ConstSensor, SpyServo};
use balltrack_core::{
    BuildError, ControlCfg, FirmwareBuilder, FirmwareCfg, ModeTiming, PowerLaw, SamplingCfg,
    ServoLimits,
};
use rstest::rstest;

fn build(cfg: FirmwareCfg) -> eyre::Result<()> {
    FirmwareBuilder::new()
        .with_sensor(ConstSensor(1))
        .with_servo(SpyServo::default())
        .with_config(cfg)
        .build()
        .map(|_| ())
}

#[test]
fn defaults_build() {
    build(FirmwareCfg::default()).unwrap();
}

#[rstest]
#[case::zero_tick(FirmwareCfg { timing: ModeTiming { tick_ms: 0, ..ModeTiming::default() }, ..FirmwareCfg::default() })]
#[case::cutoff_before_hold(FirmwareCfg { timing: ModeTiming { run_cutoff_ms: 10_000, ..ModeTiming::default() }, ..FirmwareCfg::default() })]
#[case::inverted_servo(FirmwareCfg { servo: ServoLimits { zero_deg: 90, min_deg: 120, max_deg: 60 }, ..FirmwareCfg::default() })]
#[case::zero_outside(FirmwareCfg { servo: ServoLimits { zero_deg: 5, min_deg: 10, max_deg: 170 }, ..FirmwareCfg::default() })]
#[case::no_readings(FirmwareCfg { sampling: SamplingCfg { readings: 0, ..SamplingCfg::default() }, ..FirmwareCfg::default() })]
#[case::rising_curve(FirmwareCfg { sampling: SamplingCfg { curve: PowerLaw { coefficient: 1.0, exponent: 1.0 }, ..SamplingCfg::default() }, ..FirmwareCfg::default() })]
#[case::nan_gain(FirmwareCfg { control: ControlCfg { kp: f32::NAN, ..ControlCfg::default() }, ..FirmwareCfg::default() })]
#[case::tiny_line(FirmwareCfg { max_line_len: 4, ..FirmwareCfg::default() })]
fn invalid_configs_are_rejected(#[case] cfg: FirmwareCfg) {
    let err = build(cfg).expect_err("should be rejected");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

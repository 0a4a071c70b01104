use mcs_core::error::BuildError;
use mcs_core::{AxisCfg, AxisPhase, LimiterCfg, LoopCfg, MountLoop, TrackingCfg, TravelLimits};
use mcs_traits::{Axis, HalfBuffer, ManualTimeSource};
use rstest::rstest;

#[rstest]
fn missing_time_source_yields_typed_build_error() {
    let err = MountLoop::builder()
        .try_build()
        .expect_err("should fail with MissingTimeSource");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingTimeSource) => {}
        other => panic!("expected MissingTimeSource, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_period(
    LoopCfg { tracking: TrackingCfg { time_int: 0.0, ..TrackingCfg::default() }, ..LoopCfg::default() },
    "time_int"
)]
#[case::nan_period(
    LoopCfg { tracking: TrackingCfg { time_int: f64::NAN, ..TrackingCfg::default() }, ..LoopCfg::default() },
    "time_int"
)]
#[case::empty_buffer(
    LoopCfg { tracking: TrackingCfg { lookahead_len: 0, ..TrackingCfg::default() }, ..LoopCfg::default() },
    "lookahead_len"
)]
#[case::negative_latency(
    LoopCfg { tracking: TrackingCfg { trigger_latency: -0.1, ..TrackingCfg::default() }, ..LoopCfg::default() },
    "trigger_latency"
)]
#[case::too_many_digits(
    LoopCfg { tracking: TrackingCfg { fraction_digits: 10, ..TrackingCfg::default() }, ..LoopCfg::default() },
    "fraction_digits"
)]
#[case::negative_jump(
    LoopCfg { limiter: LimiterCfg { jump_threshold: -1.0, ..LimiterCfg::default() }, ..LoopCfg::default() },
    "jump_threshold"
)]
fn invalid_config_is_rejected(#[case] cfg: LoopCfg, #[case] needle: &str) {
    let err = MountLoop::builder()
        .with_config(cfg)
        .with_time_source(ManualTimeSource::new(0.0))
        .build()
        .expect_err("config should be rejected");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
#[case(AxisCfg { travel: TravelLimits { lower: 90.0, upper: 15.0 }, ..AxisCfg::elevation_default() }, "travel")]
#[case(AxisCfg { travel: TravelLimits { lower: 15.0, upper: 15.0 }, ..AxisCfg::elevation_default() }, "travel")]
fn inverted_travel_limits_are_rejected(#[case] axis: AxisCfg, #[case] needle: &str) {
    let err = MountLoop::builder()
        .with_axis(Axis::Elevation, axis)
        .with_time_source(ManualTimeSource::new(0.0))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn zero_kinematic_limits_are_rejected() {
    let mut az = AxisCfg::azimuth_default();
    az.kinematics.max_acc = 0.0;
    let err = MountLoop::builder()
        .with_axis(Axis::Azimuth, az)
        .with_time_source(ManualTimeSource::new(0.0))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("max_acc"), "{err}");
}

#[test]
fn defaults_build_an_idle_loop() {
    let mount = MountLoop::builder()
        .with_handshake(Axis::Elevation, HalfBuffer::Top)
        .with_time_source(ManualTimeSource::new(0.0))
        .build()
        .unwrap();
    assert_eq!(mount.phase(Axis::Azimuth), AxisPhase::Idle);
    assert_eq!(mount.cfg().handshake.elevation, HalfBuffer::Top);
    assert_eq!(mount.slots().recent(), None);
    assert!((mount.sequencer().extrapolator().buffer_period() - 0.1).abs() < 1e-12);
}

#[test]
fn toml_defaults_convert_and_build() {
    let cfg = mcs_config::load_toml("[limiter]\nenabled = true\n").unwrap();
    cfg.validate().unwrap();
    let mount = MountLoop::builder()
        .with_config(LoopCfg::from(&cfg))
        .with_time_source(ManualTimeSource::new(0.0))
        .build()
        .unwrap();
    assert!(mount.cfg().limiter.enabled);
}

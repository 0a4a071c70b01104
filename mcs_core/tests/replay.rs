use std::sync::atomic::AtomicBool;

use approx::assert_abs_diff_eq;
use mcs_core::{
    DemandSample, FanoutMask, KinematicLimits, LimiterCfg, LoopCfg, MountLoop, ReplayOptions,
    replay, replay_realtime,
};
use mcs_sim::{SimConfig, SimulatedController};
use mcs_traits::{Axis, ManualTimeSource};

const T0: f64 = 50_000.0;

fn az_at(t: f64) -> f64 {
    100.0 + 0.5 * (t - T0)
}

fn el_at(t: f64) -> f64 {
    45.0 + 0.2 * (t - T0)
}

/// 20 Hz demand stream on a steady ramp, applied 150 ms after sending.
fn ramp_stream(n: usize) -> Vec<DemandSample> {
    (0..n)
        .map(|i| {
            let send = T0 + i as f64 * 0.05;
            let apply = send + 0.15;
            DemandSample {
                send_time: send,
                apply_time: apply,
                track_id: 42,
                azimuth: az_at(apply),
                elevation: el_at(apply),
            }
        })
        .collect()
}

fn setup(cfg: LoopCfg) -> (MountLoop, ManualTimeSource, SimulatedController) {
    let clock = ManualTimeSource::new(T0);
    let sim = SimulatedController::new(SimConfig {
        time_int: cfg.tracking.time_int,
        lookahead_len: cfg.tracking.lookahead_len,
        time_standard: cfg.tracking.time_standard,
    })
    .with_position(Axis::Azimuth, az_at(T0))
    .with_position(Axis::Elevation, el_at(T0));
    let mount = MountLoop::builder()
        .with_config(cfg)
        .with_time_source(clock.clone())
        .build()
        .unwrap();
    (mount, clock, sim)
}

#[test]
fn ramp_is_tracked_without_starving_the_controller() {
    let (mut mount, clock, mut sim) = setup(LoopCfg::default());
    let report = replay(
        &mut mount,
        &clock,
        &mut sim,
        &ramp_stream(60),
        &ReplayOptions::default(),
    )
    .unwrap();

    assert_eq!(report.errors, 0);
    assert_eq!(report.demands, 60);
    assert_abs_diff_eq!(report.trigger_time.unwrap(), T0 + 0.25, epsilon = 1e-6);
    assert!(sim.is_running());
    for axis in Axis::BOTH {
        assert_eq!(sim.axis(axis).starved(), 0, "{axis} starved");
        assert!(sim.axis(axis).flips() > 30);
    }
    // About 3.7 s of motion in 0.1 s halves on two axes.
    assert!(report.buffers_written >= 70, "{}", report.buffers_written);

    let end = T0 + 2.95 + 1.0;
    assert_abs_diff_eq!(report.final_position.azimuth, az_at(end), epsilon = 0.01);
    assert_abs_diff_eq!(report.final_position.elevation, el_at(end), epsilon = 0.01);

    // The recording stops; its last demand goes stale.
    assert!(report.missed_samples > 0);

    let armed: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.output.mask.contains(FanoutMask::ARM_TIME_INTERRUPT))
        .collect();
    assert_eq!(armed.len(), 1);
    assert!(armed[0].output.track_id_changed);
    assert!(report.records.iter().all(|r| !r.output.mask.is_empty()));
}

#[test]
fn shaping_holds_the_mount_to_its_velocity_limit() {
    let mut cfg = LoopCfg {
        limiter: LimiterCfg {
            enabled: true,
            ..LimiterCfg::default()
        },
        ..LoopCfg::default()
    };
    for axis in Axis::BOTH {
        cfg.axes.get_mut(axis).kinematics = KinematicLimits {
            max_vel: 0.1,
            max_acc: 0.5,
        };
    }
    let (mut mount, clock, mut sim) = setup(cfg);
    let report = replay(
        &mut mount,
        &clock,
        &mut sim,
        &ramp_stream(60),
        &ReplayOptions::default(),
    )
    .unwrap();

    assert_eq!(report.errors, 0);
    let az = report.final_position.azimuth;
    // Unlimited the ramp would end near 101.975.
    assert!(az > 100.0 && az < 101.0, "azimuth {az}");
}

#[test]
fn controller_failure_aborts_replay() {
    let (mut mount, clock, mut sim) = setup(LoopCfg::default());
    sim.fail_next_write("bus timeout");
    let err = replay(
        &mut mount,
        &clock,
        &mut sim,
        &ramp_stream(10),
        &ReplayOptions::default(),
    )
    .unwrap_err();
    assert!(err.chain().any(|c| c.to_string().contains("bus timeout")));
    assert!(err.to_string().contains("replay tick"));
}

#[test]
fn empty_stream_is_an_error() {
    let (mut mount, clock, mut sim) = setup(LoopCfg::default());
    let err = replay(&mut mount, &clock, &mut sim, &[], &ReplayOptions::default()).unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn paced_replay_honours_stop_flag() {
    let (mut mount, clock, mut sim) = setup(LoopCfg::default());
    let stop = AtomicBool::new(true);
    let report = replay_realtime(
        &mut mount,
        &clock,
        &mut sim,
        ramp_stream(5),
        &ReplayOptions::default(),
        &stop,
    )
    .unwrap();
    assert!(report.interrupted);
    assert_eq!(report.cycles, 0);
}

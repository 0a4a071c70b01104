#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mcs_core::{AxisFitState, KinematicLimiter, KinematicLimits, TimedPosition};

#[derive(Debug, Arbitrary)]
struct Input {
    times: [f64; 3],
    positions: [f64; 3],
    current: f64,
    max_vel: f64,
    max_acc: f64,
    jump: f64,
    calls: u8,
}

fuzz_target!(|input: Input| {
    let finite = |v: &f64| v.is_finite() && v.abs() < 1e6;
    if !(input.times.iter().all(finite)
        && input.positions.iter().all(finite)
        && finite(&input.current)
        && finite(&input.jump))
    {
        return;
    }
    let limits = KinematicLimits {
        max_vel: input.max_vel.abs().clamp(1e-3, 100.0),
        max_acc: input.max_acc.abs().clamp(1e-3, 100.0),
    };
    let limiter = KinematicLimiter::new(input.jump.abs());
    let mut state = AxisFitState::default();
    let mut t = input.times;
    for _ in 0..=input.calls % 8 {
        let samples = [
            TimedPosition::new(t[0], input.positions[0]),
            TimedPosition::new(t[1], input.positions[1]),
            TimedPosition::new(t[2], input.positions[2]),
        ];
        if let Ok(out) = limiter.limit(samples, limits, input.current, &mut state) {
            assert!(out.velocity.abs() <= limits.max_vel * (1.0 + 1e-9));
        }
        // Advance the oldest slot past the newest, as ingest would.
        let (oldest, newest) = (
            (0..3).min_by(|&a, &b| t[a].total_cmp(&t[b])).unwrap_or(0),
            t.iter().copied().fold(f64::MIN, f64::max),
        );
        t[oldest] = newest + 0.05;
    }
});

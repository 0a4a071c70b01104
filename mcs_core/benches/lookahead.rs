use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use mcs_core::{
    AxisFitState, Extrapolator, FitModel, KinematicLimiter, KinematicLimits, TimedPosition,
};

fn samples(k: usize) -> [TimedPosition; 3] {
    let t = k as f64 * 0.05;
    let p = |t: f64| 120.0 + 0.3 * t - 0.01 * t * t;
    [
        TimedPosition::new(t, p(t)),
        TimedPosition::new(t + 0.05, p(t + 0.05)),
        TimedPosition::new(t + 0.1, p(t + 0.1)),
    ]
}

fn bench_extrapolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("extrapolate");
    for (name, len) in [("n10", 10usize), ("n20", 20), ("n200", 200)] {
        let ex = Extrapolator::new(0.005, len, FitModel::Quadratic);
        group.bench_function(name, |b| {
            b.iter_batched(
                AxisFitState::default,
                |mut st| ex.extrapolate(black_box(samples(7)), black_box(0.2), &mut st),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_limiter(c: &mut Criterion) {
    let limiter = KinematicLimiter::default();
    let limits = KinematicLimits::default();
    c.bench_function("limiter/stream_100", |b| {
        b.iter(|| {
            let mut st = AxisFitState::default();
            for k in 0..100 {
                let _ = limiter.limit(black_box(samples(k)), limits, 120.0, &mut st);
            }
            st.prev_velocity
        })
    });
}

criterion_group!(benches, bench_extrapolate, bench_limiter);
criterion_main!(benches);

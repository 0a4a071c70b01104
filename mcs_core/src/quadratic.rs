//! Closed-form polynomial fits through three timed positions.
//!
//! Times should be reckoned from a local zero close to the samples (the
//! sequencer subtracts the earliest apply time) to keep rounding small.

use crate::error::FollowError;
use crate::util::sort3_by_time;

/// A position sample at time `t` (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimedPosition {
    pub t: f64,
    pub p: f64,
}

impl TimedPosition {
    #[inline]
    pub const fn new(t: f64, p: f64) -> Self {
        Self { t, p }
    }
}

/// Coefficients of `p(t) = c0 + c1*t + c2*t²`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quadratic {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
}

impl Quadratic {
    #[inline]
    pub const fn new(c0: f64, c1: f64, c2: f64) -> Self {
        Self { c0, c1, c2 }
    }

    #[inline]
    pub fn position(&self, t: f64) -> f64 {
        (self.c2 * t + self.c1) * t + self.c0
    }

    #[inline]
    pub fn velocity(&self, t: f64) -> f64 {
        2.0 * self.c2 * t + self.c1
    }
}

/// Fit the parabola passing exactly through three samples (Cramer's rule).
///
/// Sample order does not matter. Fails with `Degenerate` when any two times
/// are identical.
pub fn fit_quadratic(
    a: TimedPosition,
    b: TimedPosition,
    c: TimedPosition,
) -> Result<Quadratic, FollowError> {
    let (ta, pa, tb, pb, tc, pc) = (a.t, a.p, b.t, b.p, c.t, c.p);
    let ab = ta - tb;
    let bc = tb - tc;
    let ac = ta - tc;
    let d = ab * bc * ac;
    if d == 0.0 {
        return Err(FollowError::Degenerate);
    }

    let c0 = (pa * tb * tc * bc - pb * ta * tc * ac + pc * ta * tb * ab) / d;
    let c1 = (-pa * bc * (tb + tc) + pb * ac * (ta + tc) - pc * ab * (ta + tb)) / d;
    let c2 = (pa * bc - pb * ac + pc * ab) / d;
    Ok(Quadratic { c0, c1, c2 })
}

/// Straight line through the two most recent of three samples (`c2 == 0`).
pub fn fit_linear(
    a: TimedPosition,
    b: TimedPosition,
    c: TimedPosition,
) -> Result<Quadratic, FollowError> {
    let mut s = [a, b, c];
    sort3_by_time(&mut s);
    let [_, b, c] = s;
    let d = c.t - b.t;
    if d == 0.0 {
        return Err(FollowError::Degenerate);
    }
    Ok(Quadratic {
        c0: (b.p * c.t - c.p * b.t) / d,
        c1: (c.p - b.p) / d,
        c2: 0.0,
    })
}

/// Curve used to extrapolate demands into the lookahead window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitModel {
    #[default]
    Quadratic,
    Linear,
}

impl FitModel {
    pub fn fit(
        self,
        a: TimedPosition,
        b: TimedPosition,
        c: TimedPosition,
    ) -> Result<Quadratic, FollowError> {
        match self {
            Self::Quadratic => fit_quadratic(a, b, c),
            Self::Linear => fit_linear(a, b, c),
        }
    }
}

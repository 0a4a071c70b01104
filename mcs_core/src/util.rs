//! Small numeric helpers shared by the fitter and the limiter.

use crate::quadratic::TimedPosition;

/// Non-negative magnitude `a` carrying the sign of `b`; zero counts as positive.
#[inline]
pub fn sign_of(a: f64, b: f64) -> f64 {
    if b < 0.0 { -a } else { a }
}

/// Sort three samples ascending by time with three compare-and-swap steps.
///
/// Ties keep their relative order.
#[inline]
pub fn sort3_by_time(s: &mut [TimedPosition; 3]) {
    if s[0].t > s[1].t {
        s.swap(0, 1);
    }
    if s[1].t > s[2].t {
        s.swap(1, 2);
    }
    if s[0].t > s[1].t {
        s.swap(0, 1);
    }
}

/// Index of the sample whose time is strictly greater than both others.
#[inline]
pub fn newest_index(s: &[TimedPosition; 3]) -> Option<usize> {
    let (a, b, c) = (s[0].t, s[1].t, s[2].t);
    if a > b && a > c {
        Some(0)
    } else if b > a && b > c {
        Some(1)
    } else if c > a && c > b {
        Some(2)
    } else {
        None
    }
}

#[inline]
pub fn min3(a: f64, b: f64, c: f64) -> f64 {
    a.min(b).min(c)
}

//! Per-axis persistent state of the tracking loop.

use mcs_traits::Axis;

use crate::quadratic::Quadratic;

/// A value per mount axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisPair<T> {
    pub azimuth: T,
    pub elevation: T,
}

impl<T> AxisPair<T> {
    pub const fn new(azimuth: T, elevation: T) -> Self {
        Self { azimuth, elevation }
    }

    #[inline]
    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::Azimuth => &self.azimuth,
            Axis::Elevation => &self.elevation,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Azimuth => &mut self.azimuth,
            Axis::Elevation => &mut self.elevation,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> AxisPair<U> {
        AxisPair {
            azimuth: f(self.azimuth),
            elevation: f(self.elevation),
        }
    }
}

impl<T: Clone> AxisPair<T> {
    pub fn splat(v: T) -> Self {
        Self {
            azimuth: v.clone(),
            elevation: v,
        }
    }
}

/// Fit and limiter history for one axis.
///
/// Lives for the whole tracking session; only a follow disable puts it back
/// into its first-call state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFitState {
    /// Coefficients used by the last extrapolation; reused when a fit fails.
    pub coeffs: Quadratic,
    pub first_call: bool,
    /// Limiter velocity from the previous call (deg/s).
    pub prev_velocity: f64,
    /// Limiter positions written back to slots A/B/C on the previous call.
    pub prev_positions: [f64; 3],
    /// Velocity at the end of the last lookahead buffer.
    pub last_velocity: f64,
}

impl Default for AxisFitState {
    fn default() -> Self {
        Self {
            coeffs: Quadratic::default(),
            first_call: true,
            prev_velocity: 0.0,
            prev_positions: [0.0; 3],
            last_velocity: 0.0,
        }
    }
}

impl AxisFitState {
    /// Re-arm first-call initialization. Fallback coefficients are kept.
    pub fn reset(&mut self) {
        self.first_call = true;
    }
}

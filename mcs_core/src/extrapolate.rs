//! Lookahead buffer extrapolation.
//!
//! Fits the three latest demands and samples the curve at fixed steps after
//! a buffer start offset, producing the setpoints for one controller
//! half-buffer.

use crate::error::FollowError;
use crate::quadratic::{FitModel, Quadratic, TimedPosition};
use crate::state::AxisFitState;

/// Position and velocity setpoints, one pair per extrapolation step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookaheadBuffer {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl LookaheadBuffer {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Result of one extrapolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Extrapolation {
    pub buffer: LookaheadBuffer,
    /// Last position in the buffer; the last demand handed to the controller.
    pub last_position: f64,
    pub coeffs: Quadratic,
    /// The fit failed and the previous coefficients were reused.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrapolator {
    time_int: f64,
    len: usize,
    model: FitModel,
}

impl Extrapolator {
    pub fn new(time_int: f64, len: usize, model: FitModel) -> Self {
        Self {
            time_int,
            len,
            model,
        }
    }

    #[inline]
    pub fn time_int(&self) -> f64 {
        self.time_int
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn model(&self) -> FitModel {
        self.model
    }

    /// Time covered by one buffer, i.e. the spacing between buffer starts.
    #[inline]
    pub fn buffer_period(&self) -> f64 {
        self.len as f64 * self.time_int
    }

    /// Sample `coeffs` at `offset + i*time_int` for `i` in `1..=len`.
    pub fn sample(&self, coeffs: &Quadratic, offset: f64) -> LookaheadBuffer {
        let mut positions = Vec::with_capacity(self.len);
        let mut velocities = Vec::with_capacity(self.len);
        for i in 1..=self.len {
            let t = offset + i as f64 * self.time_int;
            positions.push(coeffs.position(t));
            velocities.push(coeffs.velocity(t));
        }
        LookaheadBuffer {
            positions,
            velocities,
        }
    }

    /// Fit `samples` and fill a lookahead buffer starting after `offset`.
    ///
    /// A failed fit falls back to `state.coeffs`. All-zero sample times mean
    /// the demand source has not started; nothing is produced and `state` is
    /// untouched.
    pub fn extrapolate(
        &self,
        samples: [TimedPosition; 3],
        offset: f64,
        state: &mut AxisFitState,
    ) -> Result<Extrapolation, FollowError> {
        if samples.iter().all(|s| s.t == 0.0) {
            return Err(FollowError::NotConnected);
        }

        let [a, b, c] = samples;
        let (coeffs, used_fallback) = match self.model.fit(a, b, c) {
            Ok(q) => (q, false),
            Err(_) => (state.coeffs, true),
        };

        let buffer = self.sample(&coeffs, offset);
        let last_position = buffer.positions.last().copied().unwrap_or(coeffs.c0);
        state.coeffs = coeffs;
        if let Some(v) = buffer.velocities.last() {
            state.last_velocity = *v;
        }

        Ok(Extrapolation {
            buffer,
            last_position,
            coeffs,
            used_fallback,
        })
    }
}

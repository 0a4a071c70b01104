//! Named diagnostic channels.
//!
//! Each channel gates a family of `tracing` debug records on the
//! `mcs::diag` target. Channels only decide whether a record is emitted;
//! nothing computed by the loop depends on them.

use bitflags::bitflags;
use mcs_traits::{Axis, HalfBuffer};

use crate::extrapolate::Extrapolation;
use crate::ingest::DemandSample;
use crate::limiter::LimitOutcome;
use crate::quadratic::TimedPosition;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DiagnosticChannels: u16 {
        const AZIMUTH = 1 << 0;
        const ELEVATION = 1 << 1;
        const AZIMUTH_FIT = 1 << 2;
        const ELEVATION_FIT = 1 << 3;
        const AZIMUTH_CONTROLLER = 1 << 4;
        const ELEVATION_CONTROLLER = 1 << 5;
        const AZIMUTH_SHAPER = 1 << 6;
        const ELEVATION_SHAPER = 1 << 7;
    }
}

impl DiagnosticChannels {
    pub fn demand(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::AZIMUTH,
            Axis::Elevation => Self::ELEVATION,
        }
    }

    pub fn fit(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::AZIMUTH_FIT,
            Axis::Elevation => Self::ELEVATION_FIT,
        }
    }

    pub fn controller(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::AZIMUTH_CONTROLLER,
            Axis::Elevation => Self::ELEVATION_CONTROLLER,
        }
    }

    pub fn shaper(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::AZIMUTH_SHAPER,
            Axis::Elevation => Self::ELEVATION_SHAPER,
        }
    }
}

/// Emits diagnostic records for the enabled channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: DiagnosticChannels,
}

impl Diagnostics {
    pub fn new(enabled: DiagnosticChannels) -> Self {
        Self { enabled }
    }

    #[inline]
    pub fn enabled(&self) -> DiagnosticChannels {
        self.enabled
    }

    #[inline]
    pub fn is_on(&self, ch: DiagnosticChannels) -> bool {
        self.enabled.intersects(ch)
    }

    /// Raw per-axis demand and the relative sample times used for the fit.
    pub fn demand(&self, axis: Axis, recent: usize, newest: &DemandSample, start_offset: f64) {
        if !self.is_on(DiagnosticChannels::demand(axis)) {
            return;
        }
        tracing::debug!(
            target: "mcs::diag",
            %axis,
            recent,
            apply_time = newest.apply_time,
            demand = newest.position(axis),
            track_id = newest.track_id,
            start_offset,
            "demand"
        );
    }

    pub fn fit(&self, axis: Axis, samples: &[TimedPosition; 3], ex: &Extrapolation) {
        if !self.is_on(DiagnosticChannels::fit(axis)) {
            return;
        }
        tracing::debug!(
            target: "mcs::diag",
            %axis,
            t = ?samples.map(|s| s.t),
            p = ?samples.map(|s| s.p),
            c0 = ex.coeffs.c0,
            c1 = ex.coeffs.c1,
            c2 = ex.coeffs.c2,
            fallback = ex.used_fallback,
            "fit"
        );
    }

    pub fn controller(&self, axis: Axis, half: HalfBuffer, ex: &Extrapolation) {
        if !self.is_on(DiagnosticChannels::controller(axis)) {
            return;
        }
        tracing::debug!(
            target: "mcs::diag",
            %axis,
            %half,
            positions = ?ex.buffer.positions,
            velocities = ?ex.buffer.velocities,
            last_demand = ex.last_position,
            "controller buffer"
        );
    }

    pub fn shaper(&self, axis: Axis, raw: f64, out: &LimitOutcome) {
        if !self.is_on(DiagnosticChannels::shaper(axis)) {
            return;
        }
        tracing::debug!(
            target: "mcs::diag",
            %axis,
            raw,
            shaped = out.new_position(),
            target_pos = out.target,
            velocity = out.velocity,
            braking_velocity = out.braking_velocity,
            accel = out.accel,
            limited = out.limited,
            "shaper"
        );
    }
}

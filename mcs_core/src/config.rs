//! Runtime configuration of the tracking loop.
//!
//! These are the structs `MountLoop` is built from. They are separate from
//! the TOML-deserialized config in `mcs_config`; see `conversions.rs`.

use mcs_traits::{HalfBuffer, TimeStandard};

use crate::diagnostics::DiagnosticChannels;
use crate::ingest::TravelLimits;
use crate::limiter::KinematicLimits;
use crate::quadratic::FitModel;
use crate::state::AxisPair;

/// Timing of the lookahead buffers and the start trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingCfg {
    /// Spacing of extrapolated setpoints (s).
    pub time_int: f64,
    /// Setpoints per half-buffer.
    pub lookahead_len: usize,
    /// Minimum lead of the start trigger over "now" (s).
    pub trigger_latency: f64,
    pub time_standard: TimeStandard,
    /// Decimal digits kept in the trigger fraction.
    pub fraction_digits: u8,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            time_int: 0.005,
            lookahead_len: 20,
            trigger_latency: 0.1,
            time_standard: TimeStandard::Tai,
            fraction_digits: 5,
        }
    }
}

impl TrackingCfg {
    /// Duration covered by one half-buffer (s).
    #[inline]
    pub fn buffer_period(&self) -> f64 {
        self.lookahead_len as f64 * self.time_int
    }
}

/// Ingest-time trajectory shaping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterCfg {
    pub enabled: bool,
    pub jump_threshold: f64,
    pub fit_model: FitModel,
}

impl Default for LimiterCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            jump_threshold: 0.1,
            fit_model: FitModel::Quadratic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCfg {
    pub travel: TravelLimits,
    pub kinematics: KinematicLimits,
}

impl AxisCfg {
    pub fn azimuth_default() -> Self {
        Self {
            travel: TravelLimits {
                lower: -270.0,
                upper: 270.0,
            },
            kinematics: KinematicLimits::default(),
        }
    }

    pub fn elevation_default() -> Self {
        Self {
            travel: TravelLimits {
                lower: 15.0,
                upper: 90.0,
            },
            kinematics: KinematicLimits::default(),
        }
    }
}

/// Everything needed to build a `MountLoop` apart from its time source.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCfg {
    pub tracking: TrackingCfg,
    pub limiter: LimiterCfg,
    pub axes: AxisPair<AxisCfg>,
    /// Half read by the controller while the handshake bit is clear.
    pub handshake: AxisPair<HalfBuffer>,
    pub diagnostics: DiagnosticChannels,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            tracking: TrackingCfg::default(),
            limiter: LimiterCfg::default(),
            axes: AxisPair::new(AxisCfg::azimuth_default(), AxisCfg::elevation_default()),
            handshake: AxisPair::splat(HalfBuffer::Bottom),
            diagnostics: DiagnosticChannels::empty(),
        }
    }
}

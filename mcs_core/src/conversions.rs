//! `From` implementations and helpers bridging `mcs_config` types to `mcs_core` types.

use mcs_traits::{HalfBuffer, TimeStandard};

use crate::config::{AxisCfg, LimiterCfg, LoopCfg, TrackingCfg};
use crate::diagnostics::DiagnosticChannels;
use crate::ingest::{DemandSample, TravelLimits};
use crate::limiter::KinematicLimits;
use crate::quadratic::FitModel;
use crate::state::AxisPair;

// ── Enums ────────────────────────────────────────────────────────────────────

// Neither side is local to this crate, so no `From` impl.
fn time_standard(c: mcs_config::TimeStandardCfg) -> TimeStandard {
    match c {
        mcs_config::TimeStandardCfg::Tai => TimeStandard::Tai,
        mcs_config::TimeStandardCfg::Utc => TimeStandard::Utc,
    }
}

fn half(c: mcs_config::HalfCfg) -> HalfBuffer {
    match c {
        mcs_config::HalfCfg::Bottom => HalfBuffer::Bottom,
        mcs_config::HalfCfg::Top => HalfBuffer::Top,
    }
}

impl From<mcs_config::FitModelCfg> for FitModel {
    fn from(c: mcs_config::FitModelCfg) -> Self {
        match c {
            mcs_config::FitModelCfg::Quadratic => Self::Quadratic,
            mcs_config::FitModelCfg::Linear => Self::Linear,
        }
    }
}

impl From<mcs_config::ChannelCfg> for DiagnosticChannels {
    fn from(c: mcs_config::ChannelCfg) -> Self {
        use mcs_config::ChannelCfg as C;
        match c {
            C::Azimuth => Self::AZIMUTH,
            C::Elevation => Self::ELEVATION,
            C::AzimuthFit => Self::AZIMUTH_FIT,
            C::ElevationFit => Self::ELEVATION_FIT,
            C::AzimuthController => Self::AZIMUTH_CONTROLLER,
            C::ElevationController => Self::ELEVATION_CONTROLLER,
            C::AzimuthShaper => Self::AZIMUTH_SHAPER,
            C::ElevationShaper => Self::ELEVATION_SHAPER,
        }
    }
}

// ── Sections ─────────────────────────────────────────────────────────────────

impl From<&mcs_config::Tracking> for TrackingCfg {
    fn from(c: &mcs_config::Tracking) -> Self {
        Self {
            time_int: c.time_int_s,
            lookahead_len: c.lookahead_len,
            trigger_latency: c.trigger_latency_s,
            time_standard: time_standard(c.time_standard),
            fraction_digits: c.fraction_digits,
        }
    }
}

impl From<&mcs_config::Limiter> for LimiterCfg {
    fn from(c: &mcs_config::Limiter) -> Self {
        Self {
            enabled: c.enabled,
            jump_threshold: c.jump_threshold_deg,
            fit_model: c.fit_model.into(),
        }
    }
}

impl From<&mcs_config::AxisCfg> for AxisCfg {
    fn from(c: &mcs_config::AxisCfg) -> Self {
        Self {
            travel: TravelLimits {
                lower: c.lower_limit,
                upper: c.upper_limit,
            },
            kinematics: KinematicLimits {
                max_vel: c.max_vel,
                max_acc: c.max_acc,
            },
        }
    }
}

impl From<&mcs_config::Diagnostics> for DiagnosticChannels {
    fn from(c: &mcs_config::Diagnostics) -> Self {
        c.channels
            .iter()
            .fold(Self::empty(), |acc, ch| acc | Self::from(*ch))
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&mcs_config::Config> for LoopCfg {
    fn from(c: &mcs_config::Config) -> Self {
        Self {
            tracking: (&c.tracking).into(),
            limiter: (&c.limiter).into(),
            axes: AxisPair::new((&c.axes.azimuth).into(), (&c.axes.elevation).into()),
            handshake: AxisPair::new(half(c.handshake.azimuth), half(c.handshake.elevation)),
            diagnostics: (&c.diagnostics).into(),
        }
    }
}

// ── Demand rows ──────────────────────────────────────────────────────────────

impl From<&mcs_config::DemandRow> for DemandSample {
    fn from(r: &mcs_config::DemandRow) -> Self {
        Self {
            send_time: r.send_time,
            apply_time: r.apply_time,
            track_id: r.track_id,
            azimuth: r.azimuth,
            elevation: r.elevation,
        }
    }
}

//! Type-state builder for `MountLoop`.
//!
//! The builder enforces at compile time that a time source is provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks.

use std::marker::PhantomData;

use mcs_traits::{Axis, HalfBuffer, TimeSource};

use crate::config::{AxisCfg, LimiterCfg, LoopCfg, TrackingCfg};
use crate::diagnostics::{DiagnosticChannels, Diagnostics};
use crate::error::{BuildError, Result};
use crate::extrapolate::Extrapolator;
use crate::ingest::DemandSlots;
use crate::limiter::KinematicLimiter;
use crate::mount::MountLoop;
use crate::sequencer::{BufferSwapSequencer, HandshakeConvention, SequencerCfg};
use crate::shaper::TrajectoryShaper;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `MountLoop`. All fields are validated on `build()`.
pub struct MountLoopBuilder<T> {
    cfg: LoopCfg,
    time: Option<Box<dyn TimeSource + Send>>,
    _t: PhantomData<T>,
}

impl Default for MountLoopBuilder<Missing> {
    fn default() -> Self {
        Self {
            cfg: LoopCfg::default(),
            time: None,
            _t: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

#[inline]
fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Validate configuration and assemble the loop.
fn validate_and_build(cfg: LoopCfg, time: Box<dyn TimeSource + Send>) -> Result<MountLoop> {
    // ── Validation ───────────────────────────────────────────────────────────
    let t = &cfg.tracking;
    if !positive(t.time_int) {
        return Err(invalid("time_int must be > 0"));
    }
    if t.lookahead_len == 0 {
        return Err(invalid("lookahead_len must be >= 1"));
    }
    if !(t.trigger_latency.is_finite() && t.trigger_latency >= 0.0) {
        return Err(invalid("trigger_latency must be >= 0"));
    }
    if t.fraction_digits > 9 {
        return Err(invalid("fraction_digits must be in [0, 9]"));
    }
    if cfg.limiter.jump_threshold.is_nan() || cfg.limiter.jump_threshold < 0.0 {
        return Err(invalid("jump_threshold must be >= 0"));
    }
    for axis in Axis::BOTH {
        let a = cfg.axes.get(axis);
        if a.travel.lower.is_nan() || a.travel.upper.is_nan() || a.travel.lower >= a.travel.upper {
            return Err(invalid("travel lower limit must be < upper limit"));
        }
        if !positive(a.kinematics.max_vel) {
            return Err(invalid("max_vel must be > 0"));
        }
        if !positive(a.kinematics.max_acc) {
            return Err(invalid("max_acc must be > 0"));
        }
    }

    // ── Assembly ─────────────────────────────────────────────────────────────
    let diagnostics = Diagnostics::new(cfg.diagnostics);
    let extrapolator = Extrapolator::new(t.time_int, t.lookahead_len, cfg.limiter.fit_model);
    let seq_cfg = SequencerCfg {
        trigger_latency: t.trigger_latency,
        time_standard: t.time_standard,
        fraction_digits: t.fraction_digits,
        handshake: cfg.handshake.map(HandshakeConvention::new),
    };
    let shaper = cfg.limiter.enabled.then(|| {
        TrajectoryShaper::new(
            KinematicLimiter::new(cfg.limiter.jump_threshold),
            cfg.axes.map(|a| a.kinematics),
        )
    });

    tracing::debug!(
        time_int = t.time_int,
        lookahead_len = t.lookahead_len,
        shaping = shaper.is_some(),
        "mount loop built"
    );

    Ok(MountLoop {
        slots: DemandSlots::new(cfg.axes.map(|a| a.travel)),
        sequencer: BufferSwapSequencer::new(seq_cfg, extrapolator, diagnostics),
        shaper,
        diagnostics,
        time,
        cfg,
    })
}

impl<T> MountLoopBuilder<T> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<MountLoop> {
        let time = self
            .time
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTimeSource))?;
        validate_and_build(self.cfg, time)
    }
}

/// Chainable setters that do not affect type-state.
impl<T> MountLoopBuilder<T> {
    /// Replace the whole configuration.
    pub fn with_config(mut self, cfg: LoopCfg) -> Self {
        self.cfg = cfg;
        self
    }
    pub fn with_tracking(mut self, tracking: TrackingCfg) -> Self {
        self.cfg.tracking = tracking;
        self
    }
    pub fn with_limiter(mut self, limiter: LimiterCfg) -> Self {
        self.cfg.limiter = limiter;
        self
    }
    pub fn with_axis(mut self, axis: Axis, cfg: AxisCfg) -> Self {
        *self.cfg.axes.get_mut(axis) = cfg;
        self
    }
    /// Half the controller reads on `axis` while its handshake bit is clear.
    pub fn with_handshake(mut self, axis: Axis, reading_when_clear: HalfBuffer) -> Self {
        *self.cfg.handshake.get_mut(axis) = reading_when_clear;
        self
    }
    pub fn with_diagnostics(mut self, channels: DiagnosticChannels) -> Self {
        self.cfg.diagnostics = channels;
        self
    }
}

// Setter that advances type-state
impl MountLoopBuilder<Missing> {
    pub fn with_time_source(
        self,
        time: impl TimeSource + Send + 'static,
    ) -> MountLoopBuilder<Set> {
        MountLoopBuilder {
            cfg: self.cfg,
            time: Some(Box::new(time)),
            _t: PhantomData,
        }
    }
}

impl MountLoopBuilder<Set> {
    /// Validate and build. Only available once a time source is set.
    pub fn build(self) -> Result<MountLoop> {
        self.try_build()
    }
}

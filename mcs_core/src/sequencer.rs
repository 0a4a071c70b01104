//! Buffer-swap sequencer.
//!
//! Runs once per scan cycle. It decides, per axis, whether the controller has
//! released a half-buffer (the handshake bit changed) and if so extrapolates
//! a fresh lookahead buffer into the half the controller is not reading.
//! On the first follow cycle it also computes the controller start time and
//! asks the scheduler to arm the start trigger.
//!
//! ## Axis phases
//!
//! - `Idle`: follow is off; nothing is produced.
//! - `ArmedFirst`: start time fixed, first buffer not yet written.
//! - `Running`: a buffer is written on each handshake toggle.

use bitflags::bitflags;
use mcs_traits::{Axis, AxisReadback, HalfBuffer, TimeSource, TimeStandard};

use crate::diagnostics::Diagnostics;
use crate::error::FollowError;
use crate::extrapolate::{Extrapolator, LookaheadBuffer};
use crate::ingest::DemandSample;
use crate::quadratic::TimedPosition;
use crate::state::{AxisFitState, AxisPair};
use crate::time_error::map_time_error;
use crate::util::min3;

bitflags! {
    /// Follow-on actions the external scheduler must fan out after a cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FanoutMask: u8 {
        const SET_TRACK_ID = 1;
        const FILL_AZIMUTH = 2;
        const FILL_ELEVATION = 4;
        const ARM_TIME_INTERRUPT = 8;
        const RAISE_ERROR = 16;
    }
}

impl FanoutMask {
    pub fn fill(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::FILL_AZIMUTH,
            Axis::Elevation => Self::FILL_ELEVATION,
        }
    }
}

/// Mapping between the handshake bit and the half-buffer being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConvention {
    /// Half the controller reads while the bit is clear.
    pub reading_when_clear: HalfBuffer,
}

impl Default for HandshakeConvention {
    fn default() -> Self {
        Self {
            reading_when_clear: HalfBuffer::Bottom,
        }
    }
}

impl HandshakeConvention {
    pub const fn new(reading_when_clear: HalfBuffer) -> Self {
        Self { reading_when_clear }
    }

    #[inline]
    pub fn half_being_read(&self, handshake: bool) -> HalfBuffer {
        if handshake {
            self.reading_when_clear.other()
        } else {
            self.reading_when_clear
        }
    }

    /// The half that is safe to write for the given handshake bit.
    #[inline]
    pub fn half_to_write(&self, handshake: bool) -> HalfBuffer {
        self.half_being_read(handshake).other()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisPhase {
    #[default]
    Idle,
    ArmedFirst,
    Running,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AxisChannel {
    phase: AxisPhase,
    prev_handshake: bool,
    ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerCfg {
    /// Minimum lead of the start trigger over the current time (s).
    pub trigger_latency: f64,
    pub time_standard: TimeStandard,
    pub fraction_digits: u8,
    pub handshake: AxisPair<HandshakeConvention>,
}

impl Default for SequencerCfg {
    fn default() -> Self {
        Self {
            trigger_latency: 0.1,
            time_standard: TimeStandard::Tai,
            fraction_digits: 5,
            handshake: AxisPair::default(),
        }
    }
}

/// Per-cycle input latched by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct CycleInput<'a> {
    pub slots: &'a [DemandSample; 3],
    /// Index of the most recent slot as reported by the demand source.
    pub recent: i64,
    pub follow: bool,
    pub feedback: AxisPair<AxisReadback>,
}

/// Setpoints to write into one controller half-buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisWrite {
    pub half: HalfBuffer,
    pub buffer: LookaheadBuffer,
    pub last_demand: f64,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleOutput {
    pub mask: FanoutMask,
    pub azimuth: Option<AxisWrite>,
    pub elevation: Option<AxisWrite>,
    /// Start trigger as seconds of day, set on the arming cycle.
    pub trigger_time: Option<f64>,
    pub track_id: Option<i64>,
    pub track_id_changed: bool,
    /// Latest `now - send_time` estimate (s).
    pub network_delay: f64,
    pub missed_samples: u64,
    pub error: Option<FollowError>,
}

impl CycleOutput {
    pub fn write(&self, axis: Axis) -> Option<&AxisWrite> {
        match axis {
            Axis::Azimuth => self.azimuth.as_ref(),
            Axis::Elevation => self.elevation.as_ref(),
        }
    }

    fn write_mut(&mut self, axis: Axis) -> &mut Option<AxisWrite> {
        match axis {
            Axis::Azimuth => &mut self.azimuth,
            Axis::Elevation => &mut self.elevation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferSwapSequencer {
    cfg: SequencerCfg,
    extrapolator: Extrapolator,
    diagnostics: Diagnostics,
    fit: AxisPair<AxisFitState>,
    channels: AxisPair<AxisChannel>,
    armed: bool,
    start_time: f64,
    prev_recent: Option<usize>,
    network_delay: f64,
    missed_samples: u64,
    last_track_id: Option<i64>,
}

impl BufferSwapSequencer {
    pub fn new(cfg: SequencerCfg, extrapolator: Extrapolator, diagnostics: Diagnostics) -> Self {
        Self {
            cfg,
            extrapolator,
            diagnostics,
            fit: AxisPair::default(),
            channels: AxisPair::default(),
            armed: false,
            start_time: 0.0,
            prev_recent: None,
            network_delay: 0.0,
            missed_samples: 0,
            last_track_id: None,
        }
    }

    #[inline]
    pub fn phase(&self, axis: Axis) -> AxisPhase {
        self.channels.get(axis).phase
    }

    #[inline]
    pub fn ticks(&self, axis: Axis) -> u64 {
        self.channels.get(axis).ticks
    }

    /// Controller start time, once armed.
    pub fn start_time(&self) -> Option<f64> {
        self.armed.then_some(self.start_time)
    }

    #[inline]
    pub fn fit_state(&self, axis: Axis) -> &AxisFitState {
        self.fit.get(axis)
    }

    #[inline]
    pub fn fit_states_mut(&mut self) -> &mut AxisPair<AxisFitState> {
        &mut self.fit
    }

    #[inline]
    pub fn extrapolator(&self) -> &Extrapolator {
        &self.extrapolator
    }

    #[inline]
    pub fn missed_samples(&self) -> u64 {
        self.missed_samples
    }

    /// Drop back to `Idle` on both axes and re-arm first-call handling.
    pub fn reset(&mut self) {
        if self.armed {
            tracing::info!("follow disabled, sequencer back to idle");
        }
        self.armed = false;
        for axis in Axis::BOTH {
            *self.channels.get_mut(axis) = AxisChannel::default();
            self.fit.get_mut(axis).reset();
        }
    }

    /// Run one scan cycle.
    ///
    /// Failures never escape: they come back as `error` with the mask set to
    /// `RAISE_ERROR` only, and leave the sequencer ready for the next cycle.
    pub fn cycle<T: TimeSource + ?Sized>(&mut self, input: &CycleInput<'_>, time: &T) -> CycleOutput {
        if !input.follow {
            self.reset();
            return self.quiet_output();
        }

        match self.follow_cycle(input, time) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, recent = input.recent, "tracking cycle skipped");
                CycleOutput {
                    mask: FanoutMask::RAISE_ERROR,
                    error: Some(e),
                    ..self.quiet_output()
                }
            }
        }
    }

    fn quiet_output(&self) -> CycleOutput {
        CycleOutput {
            network_delay: self.network_delay,
            missed_samples: self.missed_samples,
            ..CycleOutput::default()
        }
    }

    fn handshake_changed(&self, axis: Axis, feedback: &AxisPair<AxisReadback>) -> bool {
        let ch = self.channels.get(axis);
        ch.phase == AxisPhase::ArmedFirst || feedback.get(axis).handshake != ch.prev_handshake
    }

    fn follow_cycle<T: TimeSource + ?Sized>(
        &mut self,
        input: &CycleInput<'_>,
        time: &T,
    ) -> Result<CycleOutput, FollowError> {
        let pending = !self.armed
            || Axis::BOTH
                .iter()
                .any(|a| self.handshake_changed(*a, &input.feedback));
        if !pending {
            return Ok(self.quiet_output());
        }

        let now = time.now().map_err(|e| map_time_error(e.as_ref()))?;

        let recent = match usize::try_from(input.recent) {
            Ok(i) if i < 3 => i,
            _ => return Err(FollowError::InvalidIndex(input.recent)),
        };
        let newest = input.slots[recent];

        let least = min3(
            input.slots[0].apply_time,
            input.slots[1].apply_time,
            input.slots[2].apply_time,
        );
        let times = input.slots.map(|s| s.apply_time - least);
        if times.iter().all(|t| *t == 0.0) {
            return Err(FollowError::NotConnected);
        }

        let mut out = CycleOutput::default();
        let mut working = *input.slots;

        if !self.armed {
            for slot in &mut working {
                slot.azimuth = newest.azimuth;
                slot.elevation = newest.elevation;
            }
            let start = if newest.apply_time - now > self.cfg.trigger_latency {
                newest.apply_time
            } else {
                now + self.cfg.trigger_latency
            };
            let hmsf = time
                .to_hmsf(start, self.cfg.time_standard, self.cfg.fraction_digits)
                .map_err(|e| map_time_error(e.as_ref()))?;
            let trigger = hmsf.seconds_of_day();

            self.armed = true;
            self.start_time = start;
            for axis in Axis::BOTH {
                *self.channels.get_mut(axis) = AxisChannel {
                    phase: AxisPhase::ArmedFirst,
                    prev_handshake: input.feedback.get(axis).handshake,
                    ticks: 0,
                };
            }
            out.mask |= FanoutMask::ARM_TIME_INTERRUPT;
            out.trigger_time = Some(trigger);
            tracing::info!(start, trigger = %hmsf, "tracking armed");
        }

        if self.prev_recent != Some(recent) {
            self.network_delay = now - newest.send_time;
            self.prev_recent = Some(recent);
        }
        if newest.apply_time <= now {
            self.missed_samples += 1;
        }
        out.track_id = Some(newest.track_id);
        if self.last_track_id != Some(newest.track_id) {
            out.mask |= FanoutMask::SET_TRACK_ID;
            out.track_id_changed = true;
            self.last_track_id = Some(newest.track_id);
        }

        let period = self.extrapolator.buffer_period();
        for axis in Axis::BOTH {
            if !self.handshake_changed(axis, &input.feedback) {
                continue;
            }
            let handshake = input.feedback.get(axis).handshake;
            let ch = *self.channels.get(axis);
            let offset = self.start_time + ch.ticks as f64 * period - least;
            let samples = [
                TimedPosition::new(times[0], working[0].position(axis)),
                TimedPosition::new(times[1], working[1].position(axis)),
                TimedPosition::new(times[2], working[2].position(axis)),
            ];
            self.diagnostics.demand(axis, recent, &newest, offset);

            let ex = self
                .extrapolator
                .extrapolate(samples, offset, self.fit.get_mut(axis))?;
            if ex.used_fallback {
                tracing::warn!(%axis, "fit failed, reusing previous coefficients");
            }
            let half = self.cfg.handshake.get(axis).half_to_write(handshake);
            self.diagnostics.fit(axis, &samples, &ex);
            self.diagnostics.controller(axis, half, &ex);

            *out.write_mut(axis) = Some(AxisWrite {
                half,
                last_demand: ex.last_position,
                used_fallback: ex.used_fallback,
                buffer: ex.buffer,
            });
            out.mask |= FanoutMask::fill(axis);
            *self.channels.get_mut(axis) = AxisChannel {
                phase: AxisPhase::Running,
                prev_handshake: handshake,
                ticks: ch.ticks + 1,
            };
        }

        out.network_delay = self.network_delay;
        out.missed_samples = self.missed_samples;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_convention_writes_top_while_bit_clear() {
        let c = HandshakeConvention::default();
        assert_eq!(c.half_to_write(false), HalfBuffer::Top);
        assert_eq!(c.half_to_write(true), HalfBuffer::Bottom);
        let inverted = HandshakeConvention::new(HalfBuffer::Top);
        assert_eq!(inverted.half_to_write(false), HalfBuffer::Bottom);
    }

    #[test]
    fn fill_bits_match_axis() {
        assert_eq!(FanoutMask::fill(Axis::Azimuth).bits(), 2);
        assert_eq!(FanoutMask::fill(Axis::Elevation).bits(), 4);
        assert_eq!(FanoutMask::RAISE_ERROR.bits(), 16);
    }
}

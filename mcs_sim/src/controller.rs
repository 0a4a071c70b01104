use mcs_traits::time::TAI_MINUS_UTC_S;
use mcs_traits::{Axis, AxisReadback, HalfBuffer, MotionController, TimeStandard};

use crate::error::{Result, SimError};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Static parameters of the simulated controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Setpoint spacing (s).
    pub time_int: f64,
    /// Setpoints per half-buffer.
    pub lookahead_len: usize,
    /// Standard in which trigger seconds-of-day are interpreted.
    pub time_standard: TimeStandard,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_int: 0.005,
            lookahead_len: 20,
            time_standard: TimeStandard::Tai,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Half {
    positions: Vec<f64>,
    velocities: Vec<f64>,
}

#[inline]
fn slot(half: HalfBuffer) -> usize {
    match half {
        HalfBuffer::Bottom => 0,
        HalfBuffer::Top => 1,
    }
}

/// One simulated axis: two half-buffers, a read cursor and the handshake bit.
#[derive(Debug, Clone)]
pub struct AxisSim {
    axis: Axis,
    reading_when_clear: HalfBuffer,
    reading: HalfBuffer,
    halves: [Option<Half>; 2],
    cursor: usize,
    position: f64,
    velocity: f64,
    handshake: bool,
    starved: u64,
    flips: u64,
    writes: u64,
}

impl AxisSim {
    fn new(axis: Axis) -> Self {
        Self {
            axis,
            reading_when_clear: HalfBuffer::Bottom,
            reading: HalfBuffer::Bottom,
            halves: [None, None],
            cursor: 0,
            position: 0.0,
            velocity: 0.0,
            handshake: false,
            starved: 0,
            flips: 0,
            writes: 0,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn handshake(&self) -> bool {
        self.handshake
    }

    /// Half the controller is reading (or will read first once started).
    pub fn reading(&self) -> HalfBuffer {
        self.reading
    }

    pub fn is_loaded(&self, half: HalfBuffer) -> bool {
        self.halves[slot(half)].is_some()
    }

    /// Setpoint periods in which no loaded half was available.
    pub fn starved(&self) -> u64 {
        self.starved
    }

    /// Number of half switches (each toggles the handshake bit).
    pub fn flips(&self) -> u64 {
        self.flips
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn exhausted(&self) -> bool {
        self.halves[slot(self.reading)]
            .as_ref()
            .is_none_or(|h| self.cursor >= h.positions.len())
    }

    /// Release the current half and switch to the other one if it is loaded.
    fn try_flip(&mut self) -> bool {
        let next = self.reading.other();
        if self.halves[slot(next)].is_none() {
            return false;
        }
        self.halves[slot(self.reading)] = None;
        self.reading = next;
        self.cursor = 0;
        self.handshake = !self.handshake;
        self.flips += 1;
        tracing::trace!(axis = %self.axis, half = %next, handshake = self.handshake, "half switched");
        true
    }

    fn begin(&mut self) {
        if self.exhausted() {
            self.try_flip();
        }
    }

    fn consume_one(&mut self) {
        if self.exhausted() && !self.try_flip() {
            self.starved += 1;
            if self.starved == 1 {
                tracing::warn!(axis = %self.axis, "controller starved, holding position");
            }
            return;
        }
        if let Some(h) = &self.halves[slot(self.reading)] {
            self.position = h.positions[self.cursor];
            self.velocity = h.velocities[self.cursor];
            self.cursor += 1;
        }
        if self.exhausted() {
            self.try_flip();
        }
    }

    fn stop(&mut self) {
        self.halves = [None, None];
        self.cursor = 0;
    }
}

/// Double-buffered two-axis controller running on the caller's clock.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    cfg: SimConfig,
    axes: [AxisSim; 2],
    trigger: Option<f64>,
    start: Option<f64>,
    running: bool,
    consumed: u64,
    fail_next_write: Option<String>,
}

impl SimulatedController {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            axes: [AxisSim::new(Axis::Azimuth), AxisSim::new(Axis::Elevation)],
            trigger: None,
            start: None,
            running: false,
            consumed: 0,
            fail_next_write: None,
        }
    }

    /// Set the half read while the handshake bit is clear; call before arming.
    pub fn with_reading_when_clear(mut self, axis: Axis, half: HalfBuffer) -> Self {
        let a = self.axis_mut(axis);
        a.reading_when_clear = half;
        a.reading = if a.handshake { half.other() } else { half };
        self
    }

    /// Place the axis at `position` before motion starts.
    pub fn with_position(mut self, axis: Axis, position: f64) -> Self {
        self.axis_mut(axis).position = position;
        self
    }

    pub fn axis(&self, axis: Axis) -> &AxisSim {
        match axis {
            Axis::Azimuth => &self.axes[0],
            Axis::Elevation => &self.axes[1],
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisSim {
        match axis {
            Axis::Azimuth => &mut self.axes[0],
            Axis::Elevation => &mut self.axes[1],
        }
    }

    pub fn cfg(&self) -> &SimConfig {
        &self.cfg
    }

    /// Armed trigger as seconds of day.
    pub fn trigger(&self) -> Option<f64> {
        self.trigger
    }

    /// Absolute start time, resolved on the first service call after arming.
    pub fn start_time(&self) -> Option<f64> {
        self.start
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Make the next `write_half` fail with `SimError::Fault`.
    pub fn fail_next_write(&mut self, msg: impl Into<String>) {
        self.fail_next_write = Some(msg.into());
    }

    /// Resolve a seconds-of-day trigger to the absolute time closest to `now`.
    fn absolute_start(&self, now: f64, trigger: f64) -> f64 {
        let offset = match self.cfg.time_standard {
            TimeStandard::Tai => 0.0,
            TimeStandard::Utc => TAI_MINUS_UTC_S,
        };
        let local = now - offset;
        let mut start = (local / SECONDS_PER_DAY).floor() * SECONDS_PER_DAY + trigger;
        if start < local - SECONDS_PER_DAY / 2.0 {
            start += SECONDS_PER_DAY;
        }
        start + offset
    }

    /// Advance to `now`, consuming every setpoint that has fallen due.
    pub fn advance(&mut self, now: f64) {
        let start = match (self.start, self.trigger) {
            (Some(s), _) => s,
            (None, Some(trigger)) => {
                let s = self.absolute_start(now, trigger);
                self.start = Some(s);
                s
            }
            (None, None) => return,
        };
        if now < start {
            return;
        }
        if !self.running {
            self.running = true;
            for a in &mut self.axes {
                a.begin();
            }
            tracing::info!(start, "simulated controller started");
        }

        let due = ((now - start) / self.cfg.time_int + 1e-9).floor();
        let due = if due > 0.0 { due as u64 } else { 0 };
        while self.consumed < due {
            for a in &mut self.axes {
                a.consume_one();
            }
            self.consumed += 1;
        }
    }

    fn store(&mut self, axis: Axis, half: HalfBuffer, positions: &[f64], velocities: &[f64]) -> Result<()> {
        if let Some(msg) = self.fail_next_write.take() {
            return Err(SimError::Fault(msg));
        }
        let expected = self.cfg.lookahead_len;
        if positions.len() != expected || velocities.len() != expected {
            return Err(SimError::BufferLength {
                axis,
                expected,
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        let running = self.running;
        let a = self.axis_mut(axis);
        if running && half == a.reading {
            return Err(SimError::HalfBusy { axis, half });
        }
        a.halves[slot(half)] = Some(Half {
            positions: positions.to_vec(),
            velocities: velocities.to_vec(),
        });
        a.writes += 1;
        Ok(())
    }
}

impl MotionController for SimulatedController {
    fn readback(
        &self,
        axis: Axis,
    ) -> std::result::Result<AxisReadback, Box<dyn std::error::Error + Send + Sync>> {
        let a = self.axis(axis);
        Ok(AxisReadback {
            position: a.position,
            velocity: a.velocity,
            handshake: a.handshake,
        })
    }

    fn write_half(
        &mut self,
        axis: Axis,
        half: HalfBuffer,
        positions: &[f64],
        velocities: &[f64],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.store(axis, half, positions, velocities)?;
        Ok(())
    }

    /// Arming stops any motion in progress and drops loaded halves.
    fn arm_trigger(
        &mut self,
        seconds_of_day: f64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.running {
            tracing::info!("re-armed while running, stopping");
        }
        self.trigger = Some(seconds_of_day);
        self.start = None;
        self.running = false;
        self.consumed = 0;
        for a in &mut self.axes {
            a.stop();
        }
        Ok(())
    }

    fn service(&mut self, now: f64) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.advance(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, from: f64) -> (Vec<f64>, Vec<f64>) {
        ((0..len).map(|i| from + i as f64).collect(), vec![1.0; len])
    }

    #[test]
    fn trigger_resolves_within_the_current_day() {
        let sim = SimulatedController::new(SimConfig::default());
        let day = 10.0 * SECONDS_PER_DAY;
        assert_eq!(sim.absolute_start(day + 100.0, 100.5), day + 100.5);
        // Trigger just past midnight while "now" is just before it.
        assert_eq!(sim.absolute_start(day - 1.0, 0.5), day + 0.5);
    }

    #[test]
    fn utc_trigger_is_shifted_to_tai() {
        let sim = SimulatedController::new(SimConfig {
            time_standard: TimeStandard::Utc,
            ..SimConfig::default()
        });
        assert_eq!(sim.absolute_start(1000.0, 963.5), 1000.5);
    }

    #[test]
    fn idle_controller_accepts_any_half() {
        let mut sim = SimulatedController::new(SimConfig {
            lookahead_len: 3,
            ..SimConfig::default()
        });
        let (p, v) = ramp(3, 0.0);
        sim.store(Axis::Azimuth, HalfBuffer::Bottom, &p, &v).unwrap();
        sim.store(Axis::Azimuth, HalfBuffer::Top, &p, &v).unwrap();
        assert_eq!(sim.axis(Axis::Azimuth).writes(), 2);
    }
}

//! Replay of a recorded demand stream against a `MotionController`.
//!
//! Each scan tick services the controller, reads its feedback, ingests the
//! demands whose send time has been reached, runs one loop cycle and applies
//! the resulting fan-out (buffer writes and trigger arming). Simulated
//! replay steps a `ManualTimeSource`; paced replay follows the wall clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use mcs_traits::{Axis, AxisReadback, ManualTimeSource, MotionController};

use crate::error::Result;
use crate::feeder::DemandFeeder;
use crate::ingest::DemandSample;
use crate::mount::MountLoop;
use crate::sequencer::{CycleOutput, FanoutMask};
use crate::state::AxisPair;

/// Demands that must be in the slots before follow is asserted.
const MIN_DEMANDS_FOR_FOLLOW: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Follow is asserted this long after the first send time (s), and only
    /// once three demands have been ingested.
    pub follow_after: f64,
    /// Time simulated past the last send time (s).
    pub tail: f64,
    /// Scan period; defaults to the extrapolation period when `None`.
    pub scan_period: Option<f64>,
    /// Keep a record of every cycle that raised a fan-out bit.
    pub record: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            follow_after: 0.0,
            tail: 1.0,
            scan_period: None,
            record: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub time: f64,
    pub follow: bool,
    pub output: CycleOutput,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayReport {
    pub cycles: u64,
    pub demands: u64,
    pub buffers_written: u64,
    pub errors: u64,
    pub missed_samples: u64,
    pub trigger_time: Option<f64>,
    pub final_position: AxisPair<f64>,
    pub records: Vec<CycleRecord>,
    /// Paced replay was stopped before the end of the stream.
    pub interrupted: bool,
}

fn controller_err(
    op: &str,
    axis: Option<Axis>,
    e: &(dyn std::error::Error + Send + Sync),
) -> eyre::Report {
    match axis {
        Some(axis) => eyre::eyre!("controller {op} failed on {axis}: {e}"),
        None => eyre::eyre!("controller {op} failed: {e}"),
    }
}

fn read_feedback<C: MotionController>(controller: &C) -> Result<AxisPair<AxisReadback>> {
    let az = controller
        .readback(Axis::Azimuth)
        .map_err(|e| controller_err("readback", Some(Axis::Azimuth), e.as_ref()))?;
    let el = controller
        .readback(Axis::Elevation)
        .map_err(|e| controller_err("readback", Some(Axis::Elevation), e.as_ref()))?;
    Ok(AxisPair::new(az, el))
}

struct Session<'a, C> {
    mount: &'a mut MountLoop,
    controller: &'a mut C,
    follow_at: f64,
    record: bool,
    report: ReplayReport,
}

impl<C: MotionController> Session<'_, C> {
    fn tick(&mut self, t: f64, arrivals: impl IntoIterator<Item = DemandSample>) -> Result<()> {
        self.controller
            .service(t)
            .map_err(|e| controller_err("service", None, e.as_ref()))?;
        let feedback = read_feedback(self.controller)?;

        let follow_time = t >= self.follow_at;
        for d in arrivals {
            let follow = follow_time && self.mount.slots().count() >= MIN_DEMANDS_FOR_FOLLOW;
            let ingested = self.mount.ingest(d, follow, &feedback);
            self.report.demands += 1;
            tracing::trace!(slot = ingested.written, send_time = d.send_time, "demand ingested");
        }
        let follow = follow_time && self.mount.slots().count() >= MIN_DEMANDS_FOR_FOLLOW;

        let out = self.mount.cycle(follow, &feedback);
        self.report.cycles += 1;
        self.apply(&out)?;

        self.report.missed_samples = out.missed_samples;
        self.report.final_position = feedback.map(|r| r.position);
        if self.record && !out.mask.is_empty() {
            self.report.records.push(CycleRecord {
                time: t,
                follow,
                output: out,
            });
        }
        Ok(())
    }

    fn apply(&mut self, out: &CycleOutput) -> Result<()> {
        if out.mask.contains(FanoutMask::RAISE_ERROR) {
            self.report.errors += 1;
            return Ok(());
        }
        if let Some(trigger) = out.trigger_time {
            self.controller
                .arm_trigger(trigger)
                .map_err(|e| controller_err("arm_trigger", None, e.as_ref()))?;
            self.report.trigger_time = Some(trigger);
        }
        for axis in Axis::BOTH {
            if let Some(w) = out.write(axis) {
                self.controller
                    .write_half(axis, w.half, &w.buffer.positions, &w.buffer.velocities)
                    .map_err(|e| controller_err("write_half", Some(axis), e.as_ref()))?;
                self.report.buffers_written += 1;
            }
        }
        Ok(())
    }
}

fn stream_bounds(demands: &[DemandSample], tail: f64) -> Result<(f64, f64)> {
    let (Some(first), Some(last)) = (demands.first(), demands.last()) else {
        eyre::bail!("demand stream is empty");
    };
    Ok((first.send_time, last.send_time + tail.max(0.0)))
}

fn scan_period(mount: &MountLoop, opts: &ReplayOptions) -> Result<f64> {
    let p = opts.scan_period.unwrap_or(mount.cfg().tracking.time_int);
    if !(p.is_finite() && p > 0.0) {
        eyre::bail!("scan period must be > 0, got {p}");
    }
    Ok(p)
}

/// Replay `demands` in simulated time.
///
/// `clock` must be the time source the loop was built with; it is set to
/// every tick time before the tick runs. `demands` must be ordered by send
/// time.
pub fn replay<C: MotionController>(
    mount: &mut MountLoop,
    clock: &ManualTimeSource,
    controller: &mut C,
    demands: &[DemandSample],
    opts: &ReplayOptions,
) -> Result<ReplayReport> {
    let (t0, end) = stream_bounds(demands, opts.tail)?;
    let period = scan_period(mount, opts)?;
    let mut session = Session {
        mount,
        controller,
        follow_at: t0 + opts.follow_after,
        record: opts.record,
        report: ReplayReport::default(),
    };

    let mut next = 0usize;
    let mut i: u64 = 0;
    loop {
        let t = t0 + i as f64 * period;
        if t > end {
            break;
        }
        clock.set(t);
        let due = demands[next..]
            .iter()
            .take_while(|d| d.send_time <= t)
            .count();
        session
            .tick(t, demands[next..next + due].iter().copied())
            .wrap_err_with(|| format!("replay tick at t={t:.6}"))?;
        next += due;
        i += 1;
    }

    tracing::info!(
        cycles = session.report.cycles,
        buffers = session.report.buffers_written,
        errors = session.report.errors,
        "replay finished"
    );
    Ok(session.report)
}

/// Replay `demands` paced by the wall clock until the stream ends or `stop`
/// is raised.
pub fn replay_realtime<C: MotionController>(
    mount: &mut MountLoop,
    clock: &ManualTimeSource,
    controller: &mut C,
    demands: Vec<DemandSample>,
    opts: &ReplayOptions,
    stop: &AtomicBool,
) -> Result<ReplayReport> {
    let (t0, end) = stream_bounds(&demands, opts.tail)?;
    let period = scan_period(mount, opts)?;
    let feeder = DemandFeeder::spawn(demands, t0);
    let mut session = Session {
        mount,
        controller,
        follow_at: t0 + opts.follow_after,
        record: opts.record,
        report: ReplayReport::default(),
    };

    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::info!("paced replay interrupted");
            session.report.interrupted = true;
            break;
        }
        let t = feeder.stream_time();
        if t > end && feeder.is_exhausted() {
            break;
        }
        clock.set(t);
        session
            .tick(t, feeder.drain())
            .wrap_err_with(|| format!("replay tick at t={t:.6}"))?;
        std::thread::sleep(Duration::from_secs_f64(period));
    }

    tracing::info!(
        cycles = session.report.cycles,
        buffers = session.report.buffers_written,
        errors = session.report.errors,
        "paced replay finished"
    );
    Ok(session.report)
}

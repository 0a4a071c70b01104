//! `mcs replay`: drive the tracking loop from a recorded demand CSV against
//! the simulated controller.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use mcs_core::{CycleRecord, DemandSample, LoopCfg, MountLoop, ReplayOptions, ReplayReport};
use mcs_sim::{SimConfig, SimulatedController};
use mcs_traits::{Axis, ManualTimeSource};
use serde_json::json;

pub fn run_replay(
    cfg: &mcs_config::Config,
    demands: &Path,
    opts: &ReplayOptions,
    realtime: bool,
    json: bool,
) -> eyre::Result<()> {
    let rows = mcs_config::load_demands_csv(demands)
        .wrap_err_with(|| format!("load demand CSV {}", demands.display()))?;
    let stream: Vec<DemandSample> = rows.iter().map(DemandSample::from).collect();
    let first = *stream
        .first()
        .ok_or_else(|| eyre::eyre!("demand CSV {} contains no rows", demands.display()))?;

    let lc = LoopCfg::from(cfg);
    let clock = ManualTimeSource::new(first.send_time);
    let mut sim = SimulatedController::new(SimConfig {
        time_int: lc.tracking.time_int,
        lookahead_len: lc.tracking.lookahead_len,
        time_standard: lc.tracking.time_standard,
    });
    // The mount starts parked on the first demand.
    for axis in Axis::BOTH {
        sim = sim
            .with_reading_when_clear(axis, *lc.handshake.get(axis))
            .with_position(axis, first.position(axis));
    }
    let mut mount = MountLoop::builder()
        .with_config(lc)
        .with_time_source(clock.clone())
        .build()?;

    tracing::info!(
        demands = stream.len(),
        realtime,
        follow_after = opts.follow_after,
        "replay start"
    );
    let started = std::time::Instant::now();
    let report = if realtime {
        let stop = Arc::new(AtomicBool::new(false));
        {
            let stop = Arc::clone(&stop);
            ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
        }
        mcs_core::replay_realtime(&mut mount, &clock, &mut sim, stream, opts, &stop)?
    } else {
        mcs_core::replay(&mut mount, &clock, &mut sim, &stream, opts)?
    };

    if opts.record {
        for r in &report.records {
            println!("{}", record_json(r));
        }
    }
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    print_summary(&report, &sim, duration_ms, json);
    Ok(())
}

fn record_json(r: &CycleRecord) -> serde_json::Value {
    let o = &r.output;
    let write = |axis: Axis| {
        o.write(axis).map(|w| {
            json!({
                "half": w.half.as_str(),
                "len": w.buffer.positions.len(),
                "last_demand": w.last_demand,
                "fallback": w.used_fallback,
            })
        })
    };
    json!({
        "time": r.time,
        "follow": r.follow,
        "mask": o.mask.iter_names().map(|(name, _)| name).collect::<Vec<_>>(),
        "trigger_time": o.trigger_time,
        "track_id": o.track_id,
        "network_delay": o.network_delay,
        "missed_samples": o.missed_samples,
        "azimuth": write(Axis::Azimuth),
        "elevation": write(Axis::Elevation),
        "error": o.error.as_ref().map(ToString::to_string),
    })
}

fn print_summary(report: &ReplayReport, sim: &SimulatedController, duration_ms: u64, json: bool) {
    let starved: u64 = Axis::BOTH.iter().map(|&a| sim.axis(a).starved()).sum();
    if json {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        println!(
            "{}",
            json!({
                "timestamp": ts,
                "duration_ms": duration_ms,
                "cycles": report.cycles,
                "demands": report.demands,
                "buffers_written": report.buffers_written,
                "errors": report.errors,
                "missed_samples": report.missed_samples,
                "trigger_time": report.trigger_time,
                "final_azimuth": report.final_position.azimuth,
                "final_elevation": report.final_position.elevation,
                "starved": starved,
                "interrupted": report.interrupted,
            })
        );
    } else {
        println!(
            "replay complete: {} cycles, {} demands, {} buffers written, {} errors, {} missed samples",
            report.cycles, report.demands, report.buffers_written, report.errors, report.missed_samples
        );
        match report.trigger_time {
            Some(t) => println!("trigger armed at {t:.5}"),
            None => println!("trigger never armed"),
        }
        println!(
            "final position: az {:.4} el {:.4} (starved {starved}){}",
            report.final_position.azimuth,
            report.final_position.elevation,
            if report.interrupted { " [interrupted]" } else { "" }
        );
    }
}

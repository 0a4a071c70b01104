//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "mcs", version, about = "Mount control trajectory tools")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/mcs.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

impl Cli {
    /// Commands that run without a config file.
    pub fn needs_config(&self) -> bool {
        !matches!(self.cmd, Commands::Fit { .. })
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the config, then print the effective loop settings
    CheckConfig,
    /// Fit a curve through three (time, position) points
    Fit {
        /// Sample as "t,p"; give exactly three
        #[arg(long = "point", value_name = "T,P", required = true, value_parser = parse_point)]
        points: Vec<(f64, f64)>,
        /// Straight line through the two latest points instead of a parabola
        #[arg(long, action = ArgAction::SetTrue)]
        linear: bool,
        /// Also evaluate position and velocity at this time
        #[arg(long, value_name = "T")]
        at: Option<f64>,
    },
    /// Replay a recorded demand CSV against the simulated controller
    Replay {
        /// Demand CSV (send_time,apply_time,track_id,azimuth,elevation)
        #[arg(long, value_name = "FILE")]
        demands: PathBuf,
        /// Assert follow this many seconds after the first send time
        #[arg(long, value_name = "S", default_value_t = 0.0)]
        follow_after: f64,
        /// Keep running this long after the last send time
        #[arg(long, value_name = "S", default_value_t = 1.0)]
        tail: f64,
        /// Pace the replay by the wall clock (Ctrl-C stops it)
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Print one JSON line per cycle that raised a fan-out bit
        #[arg(long, action = ArgAction::SetTrue)]
        records: bool,
    },
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (t, p) = s
        .split_once(',')
        .ok_or_else(|| format!("expected T,P but got '{s}'"))?;
    let t: f64 = t.trim().parse().map_err(|e| format!("bad time '{t}': {e}"))?;
    let p: f64 = p.trim().parse().map_err(|e| format!("bad position '{p}': {e}"))?;
    if !(t.is_finite() && p.is_finite()) {
        return Err(format!("point '{s}' must be finite"));
    }
    Ok((t, p))
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and demand-recording parsing for the mount tracking loop.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The demand CSV loader enforces headers so recorded TCS streams can be
//!   replayed offline.
use serde::Deserialize;

/// Demand recording CSV schema.
///
/// Expected headers:
/// send_time,apply_time,track_id,azimuth,elevation
///
/// Example:
/// send_time,apply_time,track_id,azimuth,elevation
/// 1000.00,1000.15,1,120.0,45.0
/// 1000.05,1000.20,1,120.001,45.0005
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct DemandRow {
    pub send_time: f64,
    pub apply_time: f64,
    pub track_id: i64,
    pub azimuth: f64,
    pub elevation: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeStandardCfg {
    #[default]
    Tai,
    Utc,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tracking {
    /// Spacing of extrapolated setpoints (s)
    pub time_int_s: f64,
    /// Setpoints per half-buffer
    pub lookahead_len: usize,
    /// Minimum lead between "now" and the controller start trigger (s)
    pub trigger_latency_s: f64,
    pub time_standard: TimeStandardCfg,
    /// Decimal digits of the trigger time fraction
    pub fraction_digits: u8,
}

impl Default for Tracking {
    fn default() -> Self {
        Self {
            time_int_s: 0.005,
            lookahead_len: 20,
            trigger_latency_s: 0.1,
            time_standard: TimeStandardCfg::Tai,
            fraction_digits: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitModelCfg {
    #[default]
    Quadratic,
    Linear,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Limiter {
    /// Run the kinematic limiter on each ingested demand ("trajectory mode")
    pub enabled: bool,
    /// Position jump (deg) above which the acceleration limit is doubled
    pub jump_threshold_deg: f64,
    pub fit_model: FitModelCfg,
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            enabled: false,
            jump_threshold_deg: 0.1,
            fit_model: FitModelCfg::Quadratic,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HalfCfg {
    #[default]
    Bottom,
    Top,
}

/// Which half-buffer the controller is reading while the handshake bit is clear.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Handshake {
    pub azimuth: HalfCfg,
    pub elevation: HalfCfg,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AxisCfg {
    /// Lower travel limit (deg)
    pub lower_limit: f64,
    /// Upper travel limit (deg)
    pub upper_limit: f64,
    /// Maximum velocity (deg/s)
    pub max_vel: f64,
    /// Maximum acceleration (deg/s^2)
    pub max_acc: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Axes {
    pub azimuth: AxisCfg,
    pub elevation: AxisCfg,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            azimuth: AxisCfg {
                lower_limit: -270.0,
                upper_limit: 270.0,
                max_vel: 2.0,
                max_acc: 0.5,
            },
            elevation: AxisCfg {
                lower_limit: 15.0,
                upper_limit: 90.0,
                max_vel: 2.0,
                max_acc: 0.5,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCfg {
    Azimuth,
    Elevation,
    AzimuthFit,
    ElevationFit,
    AzimuthController,
    ElevationController,
    AzimuthShaper,
    ElevationShaper,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Diagnostics {
    /// Enabled diagnostic channels; empty disables all
    pub channels: Vec<ChannelCfg>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracking: Tracking,
    pub limiter: Limiter,
    pub handshake: Handshake,
    pub axes: Axes,
    pub diagnostics: Diagnostics,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load a recorded demand stream, enforcing the exact header row.
pub fn load_demands_csv(path: &std::path::Path) -> eyre::Result<Vec<DemandRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open demand CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["send_time", "apply_time", "track_id", "azimuth", "elevation"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "demand CSV must have headers 'send_time,apply_time,track_id,azimuth,elevation', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<DemandRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("demand CSV {:?} contains no rows", path);
    }
    for (i, pair) in rows.windows(2).enumerate() {
        if pair[1].send_time < pair[0].send_time {
            eyre::bail!(
                "demand CSV send_time must be non-decreasing (row {} goes backwards)",
                i + 3
            );
        }
    }
    Ok(rows)
}

fn validate_axis(name: &str, a: &AxisCfg) -> eyre::Result<()> {
    if !(a.lower_limit.is_finite() && a.upper_limit.is_finite()) {
        eyre::bail!("axes.{name} limits must be finite");
    }
    if a.lower_limit >= a.upper_limit {
        eyre::bail!("axes.{name}.lower_limit must be < upper_limit");
    }
    if !(a.max_vel.is_finite() && a.max_vel > 0.0) {
        eyre::bail!("axes.{name}.max_vel must be > 0");
    }
    if !(a.max_acc.is_finite() && a.max_acc > 0.0) {
        eyre::bail!("axes.{name}.max_acc must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Tracking
        if !(self.tracking.time_int_s.is_finite() && self.tracking.time_int_s > 0.0) {
            eyre::bail!("tracking.time_int_s must be > 0");
        }
        if self.tracking.time_int_s > 1.0 {
            eyre::bail!("tracking.time_int_s is unreasonably large (>1s)");
        }
        if self.tracking.lookahead_len == 0 {
            eyre::bail!("tracking.lookahead_len must be >= 1");
        }
        if self.tracking.lookahead_len > 1000 {
            eyre::bail!("tracking.lookahead_len must be <= 1000");
        }
        if !(self.tracking.trigger_latency_s.is_finite() && self.tracking.trigger_latency_s >= 0.0)
        {
            eyre::bail!("tracking.trigger_latency_s must be >= 0");
        }
        if self.tracking.fraction_digits > 9 {
            eyre::bail!("tracking.fraction_digits must be in [0, 9]");
        }

        // Limiter
        if !(self.limiter.jump_threshold_deg.is_finite() && self.limiter.jump_threshold_deg >= 0.0)
        {
            eyre::bail!("limiter.jump_threshold_deg must be >= 0");
        }

        // Axes
        validate_axis("azimuth", &self.axes.azimuth)?;
        validate_axis("elevation", &self.axes.elevation)?;

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// TAI is ahead of UTC by this many seconds (valid since 2017-01-01).
pub const TAI_MINUS_UTC_S: f64 = 37.0;

const SECONDS_PER_DAY: u64 = 86_400;

/// Time standard used when splitting an absolute time into a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeStandard {
    #[default]
    Tai,
    Utc,
}

/// Hours, minutes, seconds and an integer fraction of a second.
///
/// `fraction` counts units of `10^-fraction_digits` seconds, where
/// `fraction_digits` is the resolution requested from `TimeSource::to_hmsf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hmsf {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub fraction: u32,
    pub fraction_digits: u8,
}

impl Hmsf {
    /// Split an absolute time in seconds into its time of day.
    ///
    /// Returns `None` for negative or non-finite input, or a resolution finer
    /// than nanoseconds.
    pub fn from_seconds(t: f64, fraction_digits: u8) -> Option<Self> {
        if !t.is_finite() || t < 0.0 || fraction_digits > 9 {
            return None;
        }
        let scale = 10u64.pow(u32::from(fraction_digits));
        let day = t.rem_euclid(SECONDS_PER_DAY as f64);
        let whole = day.floor();
        let mut fraction = ((day - whole) * scale as f64).round() as u64;
        let mut secs = whole as u64;
        if fraction >= scale {
            fraction -= scale;
            secs += 1;
        }
        secs %= SECONDS_PER_DAY;
        Some(Self {
            hours: (secs / 3600) as u32,
            minutes: ((secs % 3600) / 60) as u32,
            seconds: (secs % 60) as u32,
            fraction: fraction as u32,
            fraction_digits,
        })
    }

    /// Seconds since midnight.
    pub fn seconds_of_day(&self) -> f64 {
        3600.0 * f64::from(self.hours)
            + 60.0 * f64::from(self.minutes)
            + f64::from(self.seconds)
            + f64::from(self.fraction) / 10f64.powi(i32::from(self.fraction_digits))
    }
}

impl fmt::Display for Hmsf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)?;
        if self.fraction_digits > 0 {
            write!(f, ".{:0w$}", self.fraction, w = usize::from(self.fraction_digits))?;
        }
        Ok(())
    }
}

/// Which time-source call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOp {
    Now,
    Convert,
}

/// Failure reported by a time source, carrying the library's status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSourceError {
    pub op: TimeOp,
    pub code: i64,
}

impl TimeSourceError {
    pub fn now(code: i64) -> Self {
        Self {
            op: TimeOp::Now,
            code,
        }
    }

    pub fn convert(code: i64) -> Self {
        Self {
            op: TimeOp::Convert,
            code,
        }
    }
}

impl fmt::Display for TimeSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            TimeOp::Now => write!(f, "current time query returned {}", self.code),
            TimeOp::Convert => write!(f, "time conversion returned {}", self.code),
        }
    }
}

impl std::error::Error for TimeSourceError {}

/// Source of absolute time for the tracking loop.
///
/// - now(): current time in seconds on the TAI scale
/// - to_hmsf(): split an absolute TAI time into a time of day in `standard`
pub trait TimeSource {
    fn now(&self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;

    fn to_hmsf(
        &self,
        t: f64,
        standard: TimeStandard,
        fraction_digits: u8,
    ) -> Result<Hmsf, Box<dyn std::error::Error + Send + Sync>> {
        let t = match standard {
            TimeStandard::Tai => t,
            TimeStandard::Utc => t - TAI_MINUS_UTC_S,
        };
        Hmsf::from_seconds(t, fraction_digits)
            .ok_or_else(|| TimeSourceError::convert(-1).into())
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn now(&self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).now()
    }

    fn to_hmsf(
        &self,
        t: f64,
        standard: TimeStandard,
        fraction_digits: u8,
    ) -> Result<Hmsf, Box<dyn std::error::Error + Send + Sync>> {
        (**self).to_hmsf(t, standard, fraction_digits)
    }
}

/// Wall-clock time source backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeSourceError::now(-1))?;
        Ok(since.as_secs_f64() + TAI_MINUS_UTC_S)
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    fail_now: Option<i64>,
    fail_convert: Option<i64>,
}

/// Deterministic time source whose time is advanced manually.
///
/// Clones share the same clock, so a test can keep a handle while the loop
/// owns another. Failures can be injected for the next call of either kind.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimeSource {
    pub fn new(start: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: start,
                ..ManualState::default()
            })),
        }
    }

    /// Advance the clock by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        if let Ok(mut st) = self.state.lock() {
            st.now += dt;
        }
    }

    /// Set the absolute time.
    pub fn set(&self, t: f64) {
        if let Ok(mut st) = self.state.lock() {
            st.now = t;
        }
    }

    /// Current time without going through the fallible trait call.
    pub fn peek(&self) -> f64 {
        self.state.lock().map(|st| st.now).unwrap_or(0.0)
    }

    /// Make the next `now()` fail with `code`.
    pub fn fail_next_now(&self, code: i64) {
        if let Ok(mut st) = self.state.lock() {
            st.fail_now = Some(code);
        }
    }

    /// Make the next `to_hmsf()` fail with `code`.
    pub fn fail_next_conversion(&self, code: i64) {
        if let Ok(mut st) = self.state.lock() {
            st.fail_convert = Some(code);
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.state.lock().map_err(|_| TimeSourceError::now(-1))?;
        if let Some(code) = st.fail_now.take() {
            return Err(TimeSourceError::now(code).into());
        }
        Ok(st.now)
    }

    fn to_hmsf(
        &self,
        t: f64,
        standard: TimeStandard,
        fraction_digits: u8,
    ) -> Result<Hmsf, Box<dyn std::error::Error + Send + Sync>> {
        {
            let mut st = self
                .state
                .lock()
                .map_err(|_| TimeSourceError::convert(-1))?;
            if let Some(code) = st.fail_convert.take() {
                return Err(TimeSourceError::convert(code).into());
            }
        }
        let t = match standard {
            TimeStandard::Tai => t,
            TimeStandard::Utc => t - TAI_MINUS_UTC_S,
        };
        Hmsf::from_seconds(t, fraction_digits)
            .ok_or_else(|| TimeSourceError::convert(-1).into())
    }
}

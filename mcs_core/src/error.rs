use thiserror::Error;

/// Per-cycle failures of the tracking pipeline.
///
/// None of these are fatal to the process: each is recovered at the cycle
/// boundary by reusing the last good fit or skipping the cycle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FollowError {
    #[error("degenerate sample times: two or more timestamps are equal")]
    Degenerate,
    #[error("demand source not connected: sample times are all zero")]
    NotConnected,
    #[error("time source error: {message}")]
    TimeSource { code: Option<i64>, message: String },
    #[error("incorrect value of recent slot index: {0}")]
    InvalidIndex(i64),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing time source")]
    MissingTimeSource,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Trajectory-following core of the mount control system (hardware-agnostic).
//!
//! All hardware interaction goes through `mcs_traits::MotionController` and
//! `mcs_traits::TimeSource`.
//!
//! ## Architecture
//!
//! - **Fitting**: quadratic (or linear) fit through three timed demands (`quadratic`)
//! - **Extrapolation**: lookahead buffers sampled from the fit (`extrapolate`)
//! - **Limiting**: velocity/acceleration/braking limiter (`limiter`), run at
//!   ingest time by the trajectory shaper (`shaper`)
//! - **Sequencing**: double-buffer handshake and trigger arming (`sequencer`)
//! - **Loop**: `MountLoop` ties slots, shaper and sequencer together; build it
//!   with `MountLoop::builder()`
//! - **Replay**: drives a loop from a recorded demand stream (`runner`)
//!
//! ## Timing
//!
//! All times are seconds in the configured time standard. Fits work on times
//! relative to the oldest of the three apply times so the polynomial stays
//! well conditioned.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod diagnostics;
pub mod error;
pub mod extrapolate;
pub mod feeder;
pub mod ingest;
pub mod limiter;
pub mod mount;
pub mod quadratic;
pub mod runner;
pub mod sequencer;
pub mod shaper;
pub mod state;
pub mod time_error;
pub mod util;

pub use builder::MountLoopBuilder;
pub use config::{AxisCfg, LimiterCfg, LoopCfg, TrackingCfg};
pub use diagnostics::{DiagnosticChannels, Diagnostics};
pub use error::{BuildError, FollowError, Report, Result};
pub use extrapolate::{Extrapolation, Extrapolator, LookaheadBuffer};
pub use ingest::{DemandSample, DemandSlots, Ingested, TravelLimits};
pub use limiter::{KinematicLimiter, KinematicLimits, LimitOutcome};
pub use mount::MountLoop;
pub use quadratic::{FitModel, Quadratic, TimedPosition, fit_linear, fit_quadratic};
pub use runner::{CycleRecord, ReplayOptions, ReplayReport, replay, replay_realtime};
pub use sequencer::{
    AxisPhase, AxisWrite, BufferSwapSequencer, CycleInput, CycleOutput, FanoutMask,
    HandshakeConvention, SequencerCfg,
};
pub use shaper::TrajectoryShaper;
pub use state::{AxisFitState, AxisPair};

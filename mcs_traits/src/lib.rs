//! Seam traits between the trajectory core and its collaborators.
//!
//! The core never talks to a clock or a motion controller directly; it goes
//! through `TimeSource` and `MotionController` so tests and replays can swap
//! in deterministic implementations.

pub mod controller;
pub mod time;

pub use controller::{Axis, AxisReadback, HalfBuffer, MotionController};
pub use time::{
    Hmsf, ManualTimeSource, SystemTimeSource, TimeOp, TimeSource, TimeSourceError, TimeStandard,
};

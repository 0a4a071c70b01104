//! Simulated double-buffered motion controller.
//!
//! Stands in for the real axis controller in replay and tests: it accepts
//! half-buffer writes, starts consuming setpoints at the armed trigger time
//! and toggles each axis's handshake bit whenever it moves to the other half.

pub mod controller;
pub mod error;

pub use controller::{AxisSim, SimConfig, SimulatedController};
pub use error::SimError;

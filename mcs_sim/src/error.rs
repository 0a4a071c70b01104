use mcs_traits::{Axis, HalfBuffer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("{axis} buffer length mismatch: expected {expected}, got {positions} positions and {velocities} velocities")]
    BufferLength {
        axis: Axis,
        expected: usize,
        positions: usize,
        velocities: usize,
    },
    #[error("{axis} {half} half is being read by the controller")]
    HalfBusy { axis: Axis, half: HalfBuffer },
    #[error("injected fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

use std::fmt;

/// Mount axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Azimuth,
    Elevation,
}

impl Axis {
    pub const BOTH: [Self; 2] = [Self::Azimuth, Self::Elevation];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Azimuth => "azimuth",
            Self::Elevation => "elevation",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two controller-side halves of an axis setpoint buffer.
///
/// The discriminant is the selector value handed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HalfBuffer {
    Bottom = 1,
    Top = 2,
}

impl HalfBuffer {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Self::Bottom => Self::Top,
            Self::Top => Self::Bottom,
        }
    }

    #[inline]
    pub fn selector(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bottom => "bottom",
            Self::Top => "top",
        }
    }
}

impl fmt::Display for HalfBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-axis state read back from the controller each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisReadback {
    pub position: f64,
    pub velocity: f64,
    /// Handshake bit; toggles each time the controller finishes a half-buffer.
    pub handshake: bool,
}

/// Motion controller consuming double-buffered setpoints.
pub trait MotionController {
    fn readback(
        &self,
        axis: Axis,
    ) -> Result<AxisReadback, Box<dyn std::error::Error + Send + Sync>>;

    /// Write one half-buffer of position/velocity setpoints for `axis`.
    fn write_half(
        &mut self,
        axis: Axis,
        half: HalfBuffer,
        positions: &[f64],
        velocities: &[f64],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Arm the start-of-motion trigger at `seconds_of_day`.
    fn arm_trigger(
        &mut self,
        seconds_of_day: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Let the controller consume setpoints up to `now`. Real hardware runs
    /// on its own; simulators advance here.
    fn service(&mut self, _now: f64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

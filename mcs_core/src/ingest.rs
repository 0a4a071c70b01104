//! Demand ingestion into three rotating slots.
//!
//! Demands arrive at the supervisory rate and overwrite the slots A, B, C in
//! turn. Slot identity says nothing about age; the index returned by
//! `DemandSlots::ingest` is what marks the most recent slot.

use mcs_traits::Axis;

use crate::state::AxisPair;

/// One demand packet from the supervisory system.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DemandSample {
    pub send_time: f64,
    pub apply_time: f64,
    pub track_id: i64,
    pub azimuth: f64,
    pub elevation: f64,
}

impl DemandSample {
    #[inline]
    pub fn position(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Azimuth => self.azimuth,
            Axis::Elevation => self.elevation,
        }
    }

    #[inline]
    pub fn set_position(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Azimuth => self.azimuth = value,
            Axis::Elevation => self.elevation = value,
        }
    }
}

/// End-of-travel limits of one axis (deg).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelLimits {
    pub lower: f64,
    pub upper: f64,
}

impl TravelLimits {
    /// Clamp into `[lower, upper]`; never panics on inverted bounds.
    #[inline]
    pub fn clamp(&self, v: f64) -> f64 {
        let v = if v > self.upper { self.upper } else { v };
        if v < self.lower { self.lower } else { v }
    }
}

/// Outcome of ingesting one demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ingested {
    /// Slot that now holds the most recent demand.
    pub written: usize,
    /// Azimuth of the slot that will be overwritten next (the oldest).
    pub oldest_azimuth: f64,
    /// Elevation of the slot that will be overwritten next (the oldest).
    pub oldest_elevation: f64,
    /// The demand was outside the travel limits on some axis.
    pub clamped: bool,
}

#[derive(Debug, Clone)]
pub struct DemandSlots {
    slots: [DemandSample; 3],
    counter: u64,
    limits: AxisPair<TravelLimits>,
    recent: Option<usize>,
}

impl DemandSlots {
    pub fn new(limits: AxisPair<TravelLimits>) -> Self {
        Self {
            slots: [DemandSample::default(); 3],
            counter: 0,
            limits,
            recent: None,
        }
    }

    /// Clamp `sample` to the travel limits and store it in the next slot.
    pub fn ingest(&mut self, mut sample: DemandSample) -> Ingested {
        let mut clamped = false;
        for axis in Axis::BOTH {
            let raw = sample.position(axis);
            let v = self.limits.get(axis).clamp(raw);
            if v != raw {
                clamped = true;
                tracing::debug!(%axis, demand = raw, clamped_to = v, "demand outside travel limits");
            }
            sample.set_position(axis, v);
        }

        let written = (self.counter % 3) as usize;
        let oldest = self.slots[(written + 1) % 3];
        self.slots[written] = sample;
        self.counter = self.counter.wrapping_add(1);
        self.recent = Some(written);

        Ingested {
            written,
            oldest_azimuth: oldest.azimuth,
            oldest_elevation: oldest.elevation,
            clamped,
        }
    }

    #[inline]
    pub fn slots(&self) -> &[DemandSample; 3] {
        &self.slots
    }

    /// Index of the most recently written slot, if any.
    #[inline]
    pub fn recent(&self) -> Option<usize> {
        self.recent
    }

    /// Number of demands ingested so far.
    #[inline]
    pub fn count(&self) -> u64 {
        self.counter
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [DemandSample; 3] {
        &mut self.slots
    }
}

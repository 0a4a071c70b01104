//! Trajectory shaping at ingest time.
//!
//! With the limiter enabled, every newly ingested demand is passed through
//! the kinematic limiter before the sequencer ever fits it, so that the
//! extrapolated curve already respects the axis limits.

use mcs_traits::Axis;

use crate::diagnostics::Diagnostics;
use crate::ingest::DemandSample;
use crate::limiter::{KinematicLimiter, KinematicLimits, LimitOutcome};
use crate::quadratic::TimedPosition;
use crate::state::{AxisFitState, AxisPair};
use crate::util::min3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryShaper {
    limiter: KinematicLimiter,
    limits: AxisPair<KinematicLimits>,
}

impl TrajectoryShaper {
    pub fn new(limiter: KinematicLimiter, limits: AxisPair<KinematicLimits>) -> Self {
        Self { limiter, limits }
    }

    #[inline]
    pub fn limits(&self) -> &AxisPair<KinematicLimits> {
        &self.limits
    }

    /// Shape the demand in slot `recent` in place.
    ///
    /// Without follow the slot is pinned to the current controller position;
    /// limiter history is left to the sequencer's follow-off reset. A degenerate limiter call leaves
    /// the raw demand in the slot.
    pub fn shape(
        &self,
        slots: &mut [DemandSample; 3],
        recent: usize,
        follow: bool,
        current: AxisPair<f64>,
        states: &mut AxisPair<AxisFitState>,
        diag: &Diagnostics,
    ) -> AxisPair<Option<LimitOutcome>> {
        let mut out = AxisPair::new(None, None);
        if recent > 2 {
            return out;
        }

        if !follow {
            for axis in Axis::BOTH {
                slots[recent].set_position(axis, *current.get(axis));
            }
            return out;
        }

        let least = min3(slots[0].apply_time, slots[1].apply_time, slots[2].apply_time);
        for axis in Axis::BOTH {
            let samples = [
                TimedPosition::new(slots[0].apply_time - least, slots[0].position(axis)),
                TimedPosition::new(slots[1].apply_time - least, slots[1].position(axis)),
                TimedPosition::new(slots[2].apply_time - least, slots[2].position(axis)),
            ];
            let raw = samples[recent].p;
            match self.limiter.limit(
                samples,
                *self.limits.get(axis),
                *current.get(axis),
                states.get_mut(axis),
            ) {
                Ok(o) => {
                    slots[recent].set_position(axis, o.positions[recent]);
                    diag.shaper(axis, raw, &o);
                    *out.get_mut(axis) = Some(o);
                }
                Err(e) => {
                    tracing::warn!(%axis, error = %e, "limiter skipped, keeping raw demand");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn demand(apply: f64, az: f64, el: f64) -> DemandSample {
        DemandSample {
            send_time: apply - 0.1,
            apply_time: apply,
            track_id: 1,
            azimuth: az,
            elevation: el,
        }
    }

    fn shaper() -> TrajectoryShaper {
        TrajectoryShaper::new(
            KinematicLimiter::new(0.1),
            AxisPair::new(
                KinematicLimits {
                    max_vel: 1.0,
                    max_acc: 5.0,
                },
                KinematicLimits {
                    max_vel: 5.0,
                    max_acc: 5.0,
                },
            ),
        )
    }

    #[test]
    fn limits_newest_slot_per_axis() {
        let mut slots = [
            demand(100.0, 10.0, 40.0),
            demand(101.0, 10.0, 40.0),
            demand(102.0, 12.0, 42.0),
        ];
        let mut states = AxisPair::<AxisFitState>::default();
        let out = shaper().shape(
            &mut slots,
            2,
            true,
            AxisPair::new(10.0, 40.0),
            &mut states,
            &Diagnostics::default(),
        );
        // Azimuth is velocity limited, elevation passes through.
        assert_abs_diff_eq!(slots[2].azimuth, 10.5);
        assert_abs_diff_eq!(slots[2].elevation, 42.0);
        assert!(out.azimuth.is_some_and(|o| o.limited));
        assert!(out.elevation.is_some_and(|o| !o.limited));
        assert!(!states.azimuth.first_call);
    }

    #[test]
    fn without_follow_pins_slot_to_current_position() {
        let mut slots = [demand(1.0, 10.0, 40.0); 3];
        let mut states = AxisPair::splat(AxisFitState {
            first_call: false,
            ..AxisFitState::default()
        });
        shaper().shape(
            &mut slots,
            1,
            false,
            AxisPair::new(3.0, 30.0),
            &mut states,
            &Diagnostics::default(),
        );
        assert_eq!((slots[1].azimuth, slots[1].elevation), (3.0, 30.0));
        assert_eq!(slots[0].azimuth, 10.0);
        // First-call handling is only re-armed by the sequencer.
        assert!(!states.azimuth.first_call && !states.elevation.first_call);
    }

    #[test]
    fn degenerate_times_keep_raw_demand() {
        let mut slots = [demand(5.0, 10.0, 40.0), demand(5.0, 11.0, 41.0), demand(4.0, 9.0, 39.0)];
        let mut states = AxisPair::<AxisFitState>::default();
        let out = shaper().shape(
            &mut slots,
            1,
            true,
            AxisPair::new(0.0, 0.0),
            &mut states,
            &Diagnostics::default(),
        );
        assert!(out.azimuth.is_none());
        assert_eq!(slots[1].azimuth, 11.0);
        assert!(states.azimuth.first_call);
    }
}

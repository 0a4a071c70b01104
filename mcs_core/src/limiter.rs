//! Kinematic demand limiter.
//!
//! Re-fits the newest demand of an axis so that the velocity implied by the
//! two latest samples respects the axis velocity and acceleration limits,
//! braking early when the target is close. Only the newest slot receives a
//! new position; the two older slots are given back the positions this
//! limiter wrote for them on its previous call.

use crate::error::FollowError;
use crate::quadratic::TimedPosition;
use crate::state::AxisFitState;
use crate::util::{newest_index, sign_of, sort3_by_time};

/// Velocity (deg/s) and acceleration (deg/s²) limits of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicLimits {
    pub max_vel: f64,
    pub max_acc: f64,
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            max_vel: 2.0,
            max_acc: 0.5,
        }
    }
}

/// Outcome of one limiter call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOutcome {
    /// Positions for slots A/B/C.
    pub positions: [f64; 3],
    /// Slot holding the newest sample.
    pub newest: usize,
    pub velocity: f64,
    pub accel: f64,
    /// Stopping velocity allowed by the distance left to the target.
    pub braking_velocity: f64,
    /// Latest input position after sorting by time.
    pub target: f64,
    /// Any of the velocity, acceleration or braking clips applied.
    pub limited: bool,
}

impl LimitOutcome {
    #[inline]
    pub fn new_position(&self) -> f64 {
        self.positions[self.newest]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicLimiter {
    /// Position step (deg) between the two latest samples at or above which
    /// the acceleration limit is doubled for the call.
    pub jump_threshold: f64,
}

impl Default for KinematicLimiter {
    fn default() -> Self {
        Self {
            jump_threshold: 0.1,
        }
    }
}

impl KinematicLimiter {
    pub fn new(jump_threshold: f64) -> Self {
        Self { jump_threshold }
    }

    /// Limit the newest of three (time, position) demands.
    ///
    /// `samples` are slots A/B/C in slot order; their times may be in any
    /// chronological order. `current_pos` seeds the history on the first
    /// call. On `Degenerate` no state is committed.
    pub fn limit(
        &self,
        samples: [TimedPosition; 3],
        limits: KinematicLimits,
        current_pos: f64,
        state: &mut AxisFitState,
    ) -> Result<LimitOutcome, FollowError> {
        let (prev, prev_vel) = if state.first_call {
            ([current_pos; 3], 0.0)
        } else {
            (state.prev_positions, state.prev_velocity)
        };

        let newest = newest_index(&samples).ok_or(FollowError::Degenerate)?;

        // Only the newest slot carries a fresh position.
        let mut work = [
            TimedPosition::new(samples[0].t, prev[0]),
            TimedPosition::new(samples[1].t, prev[1]),
            TimedPosition::new(samples[2].t, prev[2]),
        ];
        work[newest].p = samples[newest].p;
        let mut newpos = samples[newest].p;

        sort3_by_time(&mut work);
        let [_, b, c] = work;
        let (pb, pc) = (b.p, c.p);

        let max_vel = limits.max_vel;
        let max_acc = if (pc - pb).abs() >= self.jump_threshold {
            2.0 * limits.max_acc
        } else {
            limits.max_acc
        };

        let target = pc;
        let d = c.t - b.t;
        if d == 0.0 {
            return Err(FollowError::Degenerate);
        }

        let mut limited = false;
        let mut vel = (pc - pb) / d;
        if vel.abs() > max_vel {
            vel = sign_of(max_vel, vel);
            limited = true;
        }

        let mut accel = (vel - prev_vel) / d;
        if accel.abs() > max_acc {
            accel = sign_of(max_acc, accel);
            vel = prev_vel + d * accel;
            limited = true;
        }

        // The acceleration clip can push the velocity back over its limit.
        if vel.abs() > max_vel {
            vel = sign_of(max_vel, vel);
            accel = (vel - prev_vel) / d;
            limited = true;
        }

        // Brake so that the axis can still stop at the target.
        let braking_velocity = if vel > 0.0 {
            let distance_left = if target - pb < 0.0 { 0.0 } else { (target - pb).abs() };
            let vp = (2.0 * max_acc * distance_left).sqrt();
            if vel > vp {
                vel = vp;
                accel = (vel - prev_vel) / d;
                limited = true;
            }
            vp
        } else {
            let distance_left = if target - pb > 0.0 { 0.0 } else { (pb - target).abs() };
            let vp = -(2.0 * max_acc * distance_left).sqrt();
            if vel < vp {
                vel = vp;
                accel = (vel - prev_vel) / d;
                limited = true;
            }
            vp
        };

        if limited {
            newpos = prev_vel * d + 0.5 * accel * d * d + pb;
            // A velocity of exactly 0.0 skips the clamp, so the call that
            // stops the axis may land past the target by under one step.
            if (vel > 0.0 && newpos > target) || (vel < 0.0 && newpos < target) {
                newpos = target;
            }
        }

        let mut positions = prev;
        positions[newest] = newpos;

        state.first_call = false;
        state.prev_positions = positions;
        state.prev_velocity = vel;

        Ok(LimitOutcome {
            positions,
            newest,
            velocity: vel,
            accel,
            braking_velocity,
            target,
            limited,
        })
    }
}

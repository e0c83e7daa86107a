//! Velocity smoothing and gravity shaping shared by the player controller and
//! enemy AI.

use bevy::prelude::*;

/// Below this magnitude a target velocity counts as "stop".
pub const NEAR_ZERO_TARGET: f32 = 0.01;

const MIN_SMOOTH_TIME: f32 = 0.0001;

/// Critically damped spring state for one axis.
///
/// `velocity` is the spring's current rate of change. It has to be carried
/// between calls for the same actor and axis, otherwise the spring restarts
/// from rest every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct SmoothDamp {
    pub velocity: f32,
}

impl SmoothDamp {
    /// Moves `current` towards `target`, reaching it in roughly `smooth_time`.
    ///
    /// Larger `dt` converges further. The result never passes the target.
    pub fn step(&mut self, current: f32, target: f32, smooth_time: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return current;
        }
        let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
        let omega = 2.0 / smooth_time;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let change = current - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut output = target + (change + temp) * decay;

        // Clamp overshoot.
        if (target - current > 0.0) == (output > target) {
            output = target;
            self.velocity = (output - target) / dt;
        }
        output
    }
}

/// Per-actor smoothing accumulators.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct MotionState {
    pub horizontal: SmoothDamp,
}

impl MotionState {
    /// Smooths horizontal velocity towards `target`, picking the acceleration
    /// time for non-trivial targets and the deceleration time otherwise.
    pub fn smooth_horizontal(
        &mut self,
        current: f32,
        target: f32,
        acceleration_time: f32,
        deceleration_time: f32,
        dt: f32,
    ) -> f32 {
        let smooth_time = if target.abs() > NEAR_ZERO_TARGET {
            acceleration_time
        } else {
            deceleration_time
        };
        self.horizontal.step(current, target, smooth_time, dt)
    }
}

/// Horizontal facing sign, +1 right and -1 left.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    pub fn from_sign(x: f32) -> Self {
        if x < 0.0 { Facing::Left } else { Facing::Right }
    }

    pub fn sign(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }

    /// Follows `x` when it is larger than `threshold`, otherwise keeps facing.
    pub fn follow(&mut self, x: f32, threshold: f32) {
        if x.abs() > threshold {
            *self = Facing::from_sign(x);
        }
    }
}

/// Fast-fall and variable jump height tuning.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct GravityShaping {
    /// Applied while falling.
    pub fall_multiplier: f32,
    /// Applied while rising with the jump button released.
    pub low_jump_multiplier: f32,
}

impl Default for GravityShaping {
    fn default() -> Self {
        Self {
            fall_multiplier: 2.5,
            low_jump_multiplier: 2.0,
        }
    }
}

impl GravityShaping {
    pub fn multiplier(&self, vertical_velocity: f32, jump_held: bool, airborne: bool) -> f32 {
        if !airborne {
            1.0
        } else if vertical_velocity < 0.0 {
            self.fall_multiplier
        } else if vertical_velocity > 0.0 && !jump_held {
            self.low_jump_multiplier
        } else {
            1.0
        }
    }
}

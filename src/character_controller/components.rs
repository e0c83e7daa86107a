use avian2d::math::{Scalar, Vector};
use avian2d::prelude::*;
use bevy::prelude::*;

use crate::character_controller::input::PlayerInput;
use crate::motion::{Facing, GravityShaping, MotionState};
use crate::physics::GameLayer;

/// A marker component indicating that an entity is using a character controller.
/// Requires all components needed for the controller to function properly.
#[derive(Component)]
#[require(
    LinearVelocity,
    GravityScale,
    MovementConfig,
    GroundContact,
    MotionState,
    Facing,
    PlayerInput
)]
pub struct CharacterController;

/// Locomotion tuning for a character controller.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct MovementConfig {
    pub move_speed: Scalar,
    /// Smoothing time while accelerating towards a non-zero target speed.
    pub acceleration_time: Scalar,
    /// Smoothing time while braking to a stop.
    pub deceleration_time: Scalar,
    /// Minimum upward speed a jump leaves the character with.
    pub jump_speed: Scalar,
    /// Grace period after a valid ground contact during which a jump is still accepted.
    pub coyote_time: Scalar,
    /// Contacts whose normal has a smaller up component are walls or ceilings.
    pub min_ground_normal_y: Scalar,
    pub base_gravity_scale: Scalar,
    pub gravity: GravityShaping,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            acceleration_time: 0.08,
            deceleration_time: 0.12,
            jump_speed: 12.0,
            coyote_time: 0.08,
            min_ground_normal_y: 0.5,
            base_gravity_scale: 2.0,
            gravity: GravityShaping::default(),
        }
    }
}

impl MovementConfig {
    pub fn with_move_speed(mut self, move_speed: Scalar) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn with_jump(mut self, jump_speed: Scalar, coyote_time: Scalar) -> Self {
        self.jump_speed = jump_speed;
        self.coyote_time = coyote_time;
        self
    }

    pub fn with_smoothing(mut self, acceleration_time: Scalar, deceleration_time: Scalar) -> Self {
        self.acceleration_time = acceleration_time;
        self.deceleration_time = deceleration_time;
        self
    }
}

/// Grounded-recently window and jump readiness.
///
/// A jump is only accepted while `timer > 0` and `armed`. Jumping disarms and
/// closes the window; only a fresh qualifying contact re-arms.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct GroundContact {
    pub timer: Scalar,
    pub armed: bool,
    /// Whether a qualifying contact was seen on the latest physics step.
    pub touching: bool,
    /// Set by a jump until the sensor has seen the character leave the ground.
    pub lifting_off: bool,
}

impl GroundContact {
    /// Records a qualifying ground contact.
    pub fn refresh(&mut self, coyote_time: Scalar) {
        self.timer = coyote_time;
        self.touching = true;
        if self.timer > 0.0 {
            self.armed = true;
        }
    }

    /// Feeds one ground sensor reading.
    ///
    /// Right after a jump the sensor still reports the surface the character
    /// jumped from. Those readings are dropped while the character is moving
    /// up, until a reading without ground clears the latch.
    pub fn sense(&mut self, standing: bool, vertical_velocity: Scalar, coyote_time: Scalar) {
        if self.lifting_off {
            if standing && vertical_velocity > 0.0 {
                self.touching = false;
                return;
            }
            self.lifting_off = false;
        }

        if standing {
            self.refresh(coyote_time);
        } else {
            self.touching = false;
        }
    }

    pub fn tick(&mut self, dt: Scalar) {
        self.timer -= dt;
    }

    pub fn grounded_recently(&self) -> bool {
        self.timer > 0.0
    }

    pub fn airborne(&self) -> bool {
        !self.touching
    }

    /// Consumes a jump press. Returns the vertical velocity to apply, or `None`
    /// when the jump is refused.
    pub fn try_jump(&mut self, vertical_velocity: Scalar, jump_speed: Scalar) -> Option<Scalar> {
        if !(self.grounded_recently() && self.armed) {
            return None;
        }
        self.armed = false;
        self.timer = 0.0;
        self.lifting_off = true;
        Some(vertical_velocity.max(jump_speed))
    }
}

// Helper functions to create a character controller

impl CharacterController {
    pub fn new(collider: Collider) -> impl Bundle {
        Self::with_movement(collider, MovementConfig::default())
    }

    pub fn with_movement(collider: Collider, movement: MovementConfig) -> impl Bundle {
        // Create shape caster as a slightly smaller version of collider
        let mut caster_shape = collider.clone();
        caster_shape.set_scale(Vector::ONE * 0.95, 10);

        (
            CharacterController,
            RigidBody::Dynamic,
            collider,
            ShapeCaster::new(caster_shape, Vector::ZERO, 0.0, Dir2::NEG_Y)
                .with_max_distance(0.1)
                .with_max_hits(4)
                .with_query_filter(SpatialQueryFilter::from_mask(GameLayer::Ground)),
            LockedAxes::ROTATION_LOCKED,
            GravityScale(movement.base_gravity_scale),
            movement,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_needs_recent_ground_and_arming() {
        let mut contact = GroundContact::default();
        assert_eq!(contact.try_jump(0.0, 12.0), None);

        contact.refresh(0.08);
        assert_eq!(contact.try_jump(0.0, 12.0), Some(12.0));
        assert!(!contact.armed);
    }

    #[test]
    fn second_press_without_new_contact_is_refused() {
        let mut contact = GroundContact::default();
        contact.refresh(0.08);
        assert!(contact.try_jump(0.0, 12.0).is_some());
        assert!(!contact.grounded_recently());
        contact.tick(0.01);
        assert_eq!(contact.try_jump(12.0, 12.0), None);
    }

    #[test]
    fn stale_contact_after_jump_does_not_rearm() {
        let mut contact = GroundContact::default();
        contact.sense(true, 0.0, 0.08);
        assert!(contact.try_jump(0.0, 12.0).is_some());

        // The sensor still sees the floor on the step after the jump.
        contact.sense(true, 11.7, 0.08);
        assert!(!contact.armed);
        assert!(contact.airborne());
        assert_eq!(contact.try_jump(11.7, 12.0), None);

        contact.sense(false, 11.4, 0.08);
        contact.sense(true, -3.0, 0.08);
        assert!(contact.armed);
        assert!(contact.try_jump(0.0, 12.0).is_some());
    }

    #[test]
    fn jump_that_never_leaves_the_ground_rearms() {
        let mut contact = GroundContact::default();
        contact.sense(true, 0.0, 0.08);
        contact.try_jump(0.0, 12.0);

        // Blocked by a ceiling: still standing, no longer moving up.
        contact.sense(true, 0.0, 0.08);
        assert!(contact.armed);
        assert!(!contact.airborne());
    }

    #[test]
    fn coyote_window_expires() {
        let mut contact = GroundContact::default();
        contact.refresh(0.08);
        contact.tick(0.05);
        assert!(contact.grounded_recently());
        contact.tick(0.05);
        assert!(!contact.grounded_recently());
        assert_eq!(contact.try_jump(0.0, 12.0), None);
    }

    #[test]
    fn jump_never_reduces_upward_velocity() {
        let mut contact = GroundContact::default();
        contact.refresh(0.08);
        assert_eq!(contact.try_jump(15.0, 12.0), Some(15.0));
    }

    #[test]
    fn fresh_contact_rearms() {
        let mut contact = GroundContact::default();
        contact.refresh(0.08);
        contact.try_jump(0.0, 12.0);
        contact.refresh(0.08);
        assert!(contact.try_jump(0.0, 12.0).is_some());
    }
}

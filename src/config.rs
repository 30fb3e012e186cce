//! Tunable parameter sets.
//!
//! [`CharacterConfig`] collects every knob of the movement and throw feel;
//! [`FollowConfig`] tunes the carried object's follow servo. Both are plain
//! immutable data: the controller never writes them, and the jump gravity /
//! takeoff velocity are derived on demand rather than stored.

use bevy::prelude::*;
use thiserror::Error;

/// Validation failure for a parameter set.
///
/// Reported once at construction time; a character whose config was
/// rejected never ticks.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was zero or negative.
    #[error("`{0}` must be greater than zero")]
    NonPositive(&'static str),
    /// A parameter that must not be negative was negative.
    #[error("`{0}` must not be negative")]
    Negative(&'static str),
    /// A parameter fell outside its allowed range.
    #[error("`{0}` must be within {1}..={2}")]
    OutOfRange(&'static str, f32, f32),
}

/// Movement, jump and throw tuning for one character.
///
/// Jump arcs are specified by *height* and *time to apex* rather than by a
/// raw gravity value; [`gravity_strength`](Self::gravity_strength) and
/// [`initial_jump_velocity`](Self::initial_jump_velocity) derive the
/// physical quantities from those, so designers tune the shape of the jump
/// directly.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CharacterConfig {
    // === Movement ===
    /// Maximum horizontal speed (units/second).
    pub move_speed: f32,
    /// Speed multiplier applied while carrying a holdable (0.0 to 1.0).
    pub holding_speed_multiplier: f32,
    /// Acceleration rate toward the target speed.
    pub acceleration: f32,
    /// Deceleration rate when there is no horizontal input.
    pub deceleration: f32,
    /// Exponent of the acceleration response, in (0, 1].
    ///
    /// Values below 1 compress large speed errors and correct aggressively
    /// near the target: smooth ramp-up, snappy stops.
    pub acceleration_curve: f32,
    /// Acceleration multiplier while airborne (0.0 to 1.0).
    pub air_control: f32,

    // === Jump ===
    /// Peak height of a full jump (world units).
    pub jump_height: f32,
    /// Time from takeoff to the apex (seconds). Must be positive.
    pub jump_time_to_apex: f32,
    /// Gravity multiplier once the jump button is released mid-rise (>= 1).
    pub jump_cut_gravity_multiplier: f32,
    /// Vertical-speed band around the apex where hang gravity applies.
    pub jump_hang_threshold: f32,
    /// Gravity multiplier inside the hang band (0.0 to 1.0 floats).
    pub jump_hang_gravity_multiplier: f32,
    /// Terminal fall speed (positive; the clamp is applied downward).
    pub max_fall_speed: f32,

    // === Grace windows ===
    /// Seconds after leaving the ground during which a jump is still honored.
    pub coyote_time: f32,
    /// Seconds an early jump press is remembered and replayed on landing.
    pub jump_buffer_time: f32,

    // === Throw ===
    /// Charge ceiling; reaching it releases the throw automatically.
    pub max_throw_force: f32,
    /// Charge gained per second while the attack button is held.
    pub throw_force_increment: f32,
    /// Minimum hold duration before a release input is honored (seconds).
    ///
    /// A release at or below the threshold is ignored, so the press that
    /// grabbed the object doesn't drop it again on its own release.
    pub tap_threshold: f32,

    // === Ground sensing ===
    /// Height of the ground probe box (scaled by the character's scale).
    pub ground_check_distance: f32,
    /// Contact group bits the ground and ceiling probes test against.
    pub ground_mask: u32,

    // === Presentation ===
    /// Uniform visual scale of the character; the sign of the X component
    /// is flipped to face the last horizontal input.
    pub base_scale: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            // Movement
            move_speed: 8.0,
            holding_speed_multiplier: 0.8,
            acceleration: 15.0,
            deceleration: 12.0,
            acceleration_curve: 0.75,
            air_control: 0.8,

            // Jump: 3 units high, 0.4s to apex
            jump_height: 3.0,
            jump_time_to_apex: 0.4,
            jump_cut_gravity_multiplier: 1.5,
            jump_hang_threshold: 0.5,
            jump_hang_gravity_multiplier: 0.5,
            max_fall_speed: 15.0,

            // Grace windows
            coyote_time: 0.1,
            jump_buffer_time: 0.15,

            // Throw
            max_throw_force: 10.0,
            throw_force_increment: 1.0,
            tap_threshold: 0.2,

            // Ground sensing
            ground_check_distance: 0.1,
            ground_mask: u32::MAX,

            // Presentation
            base_scale: 0.7,
        }
    }
}

impl CharacterConfig {
    /// Downward gravity implied by the configured jump arc.
    ///
    /// `-(2 * jump_height) / jump_time_to_apex^2`; always negative.
    #[inline]
    pub fn gravity_strength(&self) -> f32 {
        -(2.0 * self.jump_height) / (self.jump_time_to_apex * self.jump_time_to_apex)
    }

    /// Takeoff velocity that reaches `jump_height` in `jump_time_to_apex`.
    #[inline]
    pub fn initial_jump_velocity(&self) -> f32 {
        self.gravity_strength().abs() * self.jump_time_to_apex
    }

    /// Create a config tuned for responsive player control.
    pub fn player() -> Self {
        Self {
            acceleration: 18.0,
            coyote_time: 0.12,
            ..default()
        }
    }

    /// Builder: set horizontal movement parameters.
    pub fn with_movement(mut self, move_speed: f32, acceleration: f32, deceleration: f32) -> Self {
        self.move_speed = move_speed;
        self.acceleration = acceleration;
        self.deceleration = deceleration;
        self
    }

    /// Builder: set the jump arc by height and time to apex.
    pub fn with_jump(mut self, height: f32, time_to_apex: f32) -> Self {
        self.jump_height = height;
        self.jump_time_to_apex = time_to_apex;
        self
    }

    /// Builder: set the coyote window.
    pub fn with_coyote_time(mut self, time: f32) -> Self {
        self.coyote_time = time;
        self
    }

    /// Builder: set the jump buffer window.
    pub fn with_jump_buffer_time(mut self, time: f32) -> Self {
        self.jump_buffer_time = time;
        self
    }

    /// Builder: set the throw charge parameters.
    pub fn with_throw(mut self, max_force: f32, increment: f32) -> Self {
        self.max_throw_force = max_force;
        self.throw_force_increment = increment;
        self
    }

    /// Builder: set the tap-vs-hold release threshold.
    pub fn with_tap_threshold(mut self, threshold: f32) -> Self {
        self.tap_threshold = threshold;
        self
    }

    /// Builder: set the contact groups sensed as ground.
    pub fn with_ground_mask(mut self, mask: u32) -> Self {
        self.ground_mask = mask;
        self
    }

    /// Builder: set the character's base visual scale.
    pub fn with_base_scale(mut self, scale: f32) -> Self {
        self.base_scale = scale;
        self
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jump_time_to_apex <= 0.0 {
            return Err(ConfigError::NonPositive("jump_time_to_apex"));
        }
        if self.base_scale <= 0.0 {
            return Err(ConfigError::NonPositive("base_scale"));
        }
        if !(self.acceleration_curve > 0.0 && self.acceleration_curve <= 1.0) {
            return Err(ConfigError::OutOfRange("acceleration_curve", 0.0, 1.0));
        }
        if !(0.0..=1.0).contains(&self.holding_speed_multiplier) {
            return Err(ConfigError::OutOfRange("holding_speed_multiplier", 0.0, 1.0));
        }
        if !(0.0..=1.0).contains(&self.air_control) {
            return Err(ConfigError::OutOfRange("air_control", 0.0, 1.0));
        }
        if !(0.0..=1.0).contains(&self.jump_hang_gravity_multiplier) {
            return Err(ConfigError::OutOfRange("jump_hang_gravity_multiplier", 0.0, 1.0));
        }
        if self.jump_cut_gravity_multiplier < 1.0 {
            return Err(ConfigError::OutOfRange(
                "jump_cut_gravity_multiplier",
                1.0,
                f32::INFINITY,
            ));
        }
        for (name, value) in [
            ("move_speed", self.move_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("jump_height", self.jump_height),
            ("jump_hang_threshold", self.jump_hang_threshold),
            ("max_fall_speed", self.max_fall_speed),
            ("coyote_time", self.coyote_time),
            ("jump_buffer_time", self.jump_buffer_time),
            ("max_throw_force", self.max_throw_force),
            ("throw_force_increment", self.throw_force_increment),
            ("tap_threshold", self.tap_threshold),
            ("ground_check_distance", self.ground_check_distance),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative(name));
            }
        }
        Ok(())
    }
}

/// Follow-servo and held-state tuning for a carriable object.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FollowConfig {
    /// Gain converting position error into desired velocity.
    pub follow_speed: f32,
    /// Gain converting velocity error into force (0.0 to 5.0).
    pub damping: f32,
    /// Magnitude clamp on the follow force.
    pub max_follow_force: f32,
    /// Distance to the anchor below which residual horizontal drift is
    /// cancelled by copying the holder's horizontal velocity.
    pub snap_epsilon: f32,
    /// Linear and angular damping applied while held, stabilizing the servo.
    pub held_damping: f32,
    /// Angular damping restored on release.
    pub rest_angular_damping: f32,
    /// Contact groups ignored while held (0 = collide with everything).
    pub held_exclusion_mask: u32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            follow_speed: 25.0,
            damping: 5.0,
            max_follow_force: 100.0,
            snap_epsilon: 0.1,
            held_damping: 2.0,
            rest_angular_damping: 0.05,
            held_exclusion_mask: 0,
        }
    }
}

impl FollowConfig {
    /// Builder: set the servo gains.
    pub fn with_servo(mut self, follow_speed: f32, damping: f32, max_force: f32) -> Self {
        self.follow_speed = follow_speed;
        self.damping = damping;
        self.max_follow_force = max_force;
        self
    }

    /// Builder: set the contact groups ignored while held.
    pub fn with_held_exclusion_mask(mut self, mask: u32) -> Self {
        self.held_exclusion_mask = mask;
        self
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=5.0).contains(&self.damping) {
            return Err(ConfigError::OutOfRange("damping", 0.0, 5.0));
        }
        for (name, value) in [
            ("follow_speed", self.follow_speed),
            ("max_follow_force", self.max_follow_force),
            ("snap_epsilon", self.snap_epsilon),
            ("held_damping", self.held_damping),
            ("rest_angular_damping", self.rest_angular_damping),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gravity_derived_from_jump_arc() {
        let config = CharacterConfig {
            jump_height: 3.0,
            jump_time_to_apex: 0.4,
            ..default()
        };

        // g = -(2 * 3) / 0.4^2 = -37.5
        assert_relative_eq!(config.gravity_strength(), -37.5);
        // v0 = 37.5 * 0.4 = 15
        assert_relative_eq!(config.initial_jump_velocity(), 15.0);
    }

    #[test]
    fn initial_jump_velocity_reaches_apex_height() {
        let config = CharacterConfig::default();
        let g = config.gravity_strength();
        let v0 = config.initial_jump_velocity();

        // Height at apex under constant gravity: v0^2 / (2 * |g|).
        let apex = v0 * v0 / (2.0 * g.abs());
        assert_relative_eq!(apex, config.jump_height, epsilon = 1e-5);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(CharacterConfig::default().validate(), Ok(()));
        assert_eq!(FollowConfig::default().validate(), Ok(()));
        assert_eq!(CharacterConfig::player().validate(), Ok(()));
    }

    #[test]
    fn zero_apex_time_is_rejected() {
        let config = CharacterConfig::default().with_jump(3.0, 0.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive("jump_time_to_apex"))
        );
    }

    #[test]
    fn out_of_range_curve_is_rejected() {
        let mut config = CharacterConfig::default();
        config.acceleration_curve = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange("acceleration_curve", _, _))
        ));

        config.acceleration_curve = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_window_is_rejected() {
        let config = CharacterConfig::default().with_coyote_time(-0.1);
        assert_eq!(config.validate(), Err(ConfigError::Negative("coyote_time")));
    }

    #[test]
    fn follow_damping_range_is_enforced() {
        let config = FollowConfig::default().with_servo(25.0, 6.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange("damping", _, _))
        ));
    }

    #[test]
    fn builders_compose() {
        let config = CharacterConfig::default()
            .with_movement(10.0, 20.0, 16.0)
            .with_jump(4.0, 0.5)
            .with_throw(12.0, 2.0)
            .with_tap_threshold(0.25);

        assert_eq!(config.move_speed, 10.0);
        assert_eq!(config.jump_height, 4.0);
        assert_eq!(config.max_throw_force, 12.0);
        assert_eq!(config.tap_threshold, 0.25);
        assert_eq!(config.validate(), Ok(()));
    }
}

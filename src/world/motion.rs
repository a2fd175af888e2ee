//! Local avatar movement: horizontal walking/running, gravity and jumping
//! against a flat ground plane.
//!
//! Integration is frame based. Every tick moves the avatar by a fixed speed
//! and applies gravity once, independent of the elapsed wall time.

use crate::config::MovementSettings;
use crate::utils::math::yaw_rotation;
use crate::world::input::MovementFlags;
use glam::{Quat, Vec3};
use tracing::debug;

/// State of the locally controlled avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAvatarState {
    pub position: Vec3,
    /// Rotation about the vertical axis, radians.
    pub yaw: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    /// Set by an accepted jump and cleared on landing.
    pub jumping: bool,
    pub flags: MovementFlags,
}

impl LocalAvatarState {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            vertical_velocity: 0.0,
            grounded: true,
            jumping: false,
            flags: MovementFlags::empty(),
        }
    }

    pub fn orientation(&self) -> Quat {
        yaw_rotation(self.yaw)
    }

    pub fn is_running(&self) -> bool {
        self.flags.contains(MovementFlags::RUNNING)
    }

    /// Avatar-space intent: -z forward, +x right. Opposing keys cancel.
    pub fn intent(&self) -> Vec3 {
        let mut direction = Vec3::ZERO;
        if self.flags.contains(MovementFlags::FORWARD) {
            direction.z -= 1.0;
        }
        if self.flags.contains(MovementFlags::BACKWARD) {
            direction.z += 1.0;
        }
        if self.flags.contains(MovementFlags::LEFT) {
            direction.x -= 1.0;
        }
        if self.flags.contains(MovementFlags::RIGHT) {
            direction.x += 1.0;
        }
        direction
    }
}

/// What happened during one motion step; feeds the animation resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    pub moving: bool,
    pub running: bool,
    pub airborne: bool,
    pub landed: bool,
}

#[derive(Debug, Clone)]
pub struct MotionModel {
    settings: MovementSettings,
}

impl MotionModel {
    pub fn new(settings: MovementSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    pub fn ground_height(&self) -> f32 {
        self.settings.ground_height
    }

    pub fn respawn_point(&self) -> Vec3 {
        Vec3::from_array(self.settings.respawn_position)
    }

    pub fn spawn(&self) -> LocalAvatarState {
        LocalAvatarState::new(self.respawn_point())
    }

    pub fn is_airborne(&self, state: &LocalAvatarState) -> bool {
        state.jumping || state.position.y > self.settings.ground_height
    }

    /// Advance one tick.
    ///
    /// Horizontal movement is applied whether or not the avatar is airborne,
    /// so a jumping avatar keeps drifting in the held direction.
    pub fn step(&self, state: &mut LocalAvatarState) -> MotionStep {
        let intent = state.intent();
        let moving = intent.length_squared() > 0.0;

        if moving {
            let speed = if state.is_running() {
                self.settings.run_speed
            } else {
                self.settings.walk_speed
            };
            let world_direction = state.orientation() * intent.normalize();
            state.position += world_direction * speed;
        }

        let mut landed = false;
        if self.is_airborne(state) {
            state.position.y += state.vertical_velocity;
            state.vertical_velocity += self.settings.gravity;

            if state.position.y <= self.settings.ground_height {
                state.position.y = self.settings.ground_height;
                state.vertical_velocity = 0.0;
                state.grounded = true;
                state.jumping = false;
                landed = true;
            }
        }

        MotionStep {
            moving,
            running: state.is_running(),
            airborne: self.is_airborne(state),
            landed,
        }
    }

    /// Start a jump. Ignored unless grounded; nothing is queued.
    pub fn try_jump(&self, state: &mut LocalAvatarState) -> bool {
        if !state.grounded {
            return false;
        }
        state.jumping = true;
        state.vertical_velocity = self.settings.jump_force;
        state.grounded = false;
        true
    }

    pub fn respawn(&self, state: &mut LocalAvatarState) {
        state.position = self.respawn_point();
        state.vertical_velocity = 0.0;
        state.grounded = true;
        state.jumping = false;
        debug!("Player respawned at {}", state.position);
    }

    pub fn look(&self, state: &mut LocalAvatarState, dx: f32) {
        state.yaw -= dx * self.settings.look_sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MotionModel {
        MotionModel::new(MovementSettings::default())
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let model = model();
        let mut state = model.spawn();
        state.flags = MovementFlags::FORWARD | MovementFlags::BACKWARD | MovementFlags::RUNNING;
        let before = state.position;

        let step = model.step(&mut state);

        assert!(!step.moving);
        assert_eq!(state.position, before);
    }

    #[test]
    fn test_forward_walk_moves_along_negative_z() {
        let model = model();
        let mut state = model.spawn();
        state.flags = MovementFlags::FORWARD;

        model.step(&mut state);

        assert!((state.position.z - -0.5).abs() < 1e-6);
        assert!((state.position.x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_diagonal_is_normalized_and_rotated() {
        let model = model();
        let mut state = model.spawn();
        state.yaw = std::f32::consts::FRAC_PI_2;
        state.flags = MovementFlags::FORWARD | MovementFlags::RIGHT | MovementFlags::RUNNING;
        let before = state.position;

        model.step(&mut state);

        let moved = state.position - before;
        assert!((moved.length() - 0.9).abs() < 1e-5);
        assert!(moved.y.abs() < 1e-6);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let model = model();
        let mut state = model.spawn();

        assert!(model.try_jump(&mut state));
        assert_eq!(state.vertical_velocity, 0.3);
        assert!(!state.grounded);

        model.step(&mut state);
        let velocity = state.vertical_velocity;
        assert!(!model.try_jump(&mut state));
        assert_eq!(state.vertical_velocity, velocity);
    }

    #[test]
    fn test_jump_lands_and_never_sinks() {
        let model = model();
        let mut state = model.spawn();
        model.try_jump(&mut state);

        let mut landed_at = None;
        for tick in 0..200 {
            let step = model.step(&mut state);
            assert!(state.position.y >= model.ground_height());
            if step.landed {
                landed_at = Some(tick);
                break;
            }
        }

        assert!(landed_at.is_some());
        assert_eq!(state.vertical_velocity, 0.0);
        assert!(state.grounded);
        assert!(!state.jumping);
        assert_eq!(state.position.y, model.ground_height());
    }

    #[test]
    fn test_falls_when_above_ground_without_jump() {
        let model = model();
        let mut state = model.spawn();
        state.position.y = 3.0;
        state.grounded = false;

        let step = model.step(&mut state);
        assert!(step.airborne);
        assert!(state.vertical_velocity < 0.0);
    }

    #[test]
    fn test_respawn_resets_motion() {
        let model = model();
        let mut state = model.spawn();
        state.position = Vec3::new(-4.0, 7.0, 12.0);
        state.vertical_velocity = -0.2;
        state.grounded = false;
        state.jumping = true;

        model.respawn(&mut state);

        assert_eq!(state.position, Vec3::new(200.0, 1.0, 0.0));
        assert_eq!(state.vertical_velocity, 0.0);
        assert!(state.grounded);
        assert!(!state.jumping);
    }

    #[test]
    fn test_look_turns_yaw() {
        let model = model();
        let mut state = model.spawn();
        model.look(&mut state, 100.0);
        assert!((state.yaw - -0.2).abs() < 1e-6);
    }
}

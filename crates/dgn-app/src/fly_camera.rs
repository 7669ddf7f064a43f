//! Keyboard fly camera: WASD moves in the view plane, Q/E moves along world
//! up, arrow keys look around.

use dgn_input::KeyboardState;
use dgn_render::Camera;
use glam::{Quat, Vec3};
use winit::keyboard::KeyCode;

/// Pitch stops this close to straight up or down so yaw stays defined.
const MAX_PITCH_SIN: f32 = 0.99;

#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub look_speed: f32,
}

impl FlyCamera {
    pub fn new(move_speed: f32, look_speed: f32) -> Self {
        Self {
            move_speed,
            look_speed,
        }
    }

    /// Apply `dt` seconds of the currently held keys to `camera`.
    pub fn update(&self, camera: &mut Camera, keyboard: &KeyboardState, dt: f32) {
        let turn = self.look_speed * dt;
        let yaw = keyboard.axis(KeyCode::ArrowRight, KeyCode::ArrowLeft) * turn;
        let pitch = keyboard.axis(KeyCode::ArrowDown, KeyCode::ArrowUp) * turn;

        let yawed = Quat::from_rotation_y(yaw) * camera.rotation;
        let pitched = Quat::from_axis_angle(yawed * Vec3::X, pitch) * yawed;
        camera.rotation = if (pitched * Vec3::NEG_Z).y.abs() <= MAX_PITCH_SIN {
            pitched.normalize()
        } else {
            yawed.normalize()
        };

        let forward = keyboard.axis(KeyCode::KeyS, KeyCode::KeyW);
        let strafe = keyboard.axis(KeyCode::KeyA, KeyCode::KeyD);
        let lift = keyboard.axis(KeyCode::KeyQ, KeyCode::KeyE);
        let direction = camera.forward() * forward + camera.right() * strafe + Vec3::Y * lift;
        camera.position += direction.normalize_or_zero() * self.move_speed * dt;
    }
}

#[cfg(test)]
mod tests {
    use dgn_input::RawKeyEvent;
    use winit::event::ElementState;
    use winit::keyboard::PhysicalKey;

    use super::*;

    fn hold(keyboard: &mut KeyboardState, code: KeyCode) {
        keyboard.process_raw(RawKeyEvent {
            key: PhysicalKey::Code(code),
            state: ElementState::Pressed,
            repeat: false,
        });
    }

    #[test]
    fn test_idle_keyboard_leaves_camera() {
        let mut camera = Camera::default();
        FlyCamera::new(3.0, 1.0).update(&mut camera, &KeyboardState::new(), 0.5);
        assert_eq!(camera.position, Vec3::ZERO);
        assert!(camera.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_forward_moves_along_view() {
        let mut camera = Camera::default();
        let mut keyboard = KeyboardState::new();
        hold(&mut keyboard, KeyCode::KeyW);
        FlyCamera::new(3.0, 1.0).update(&mut camera, &keyboard, 0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.5), 1e-5));
    }

    #[test]
    fn test_diagonal_speed_is_normalized() {
        let mut camera = Camera::default();
        let mut keyboard = KeyboardState::new();
        hold(&mut keyboard, KeyCode::KeyW);
        hold(&mut keyboard, KeyCode::KeyD);
        hold(&mut keyboard, KeyCode::KeyE);
        FlyCamera::new(2.0, 1.0).update(&mut camera, &keyboard, 1.0);
        assert!((camera.position.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_left_arrow_turns_left() {
        let mut camera = Camera::default();
        let mut keyboard = KeyboardState::new();
        hold(&mut keyboard, KeyCode::ArrowLeft);
        FlyCamera::new(1.0, std::f32::consts::FRAC_PI_2).update(&mut camera, &keyboard, 1.0);
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn test_pitch_stops_short_of_vertical() {
        let mut camera = Camera::default();
        let mut keyboard = KeyboardState::new();
        hold(&mut keyboard, KeyCode::ArrowUp);
        let fly = FlyCamera::new(1.0, 1.0);
        for _ in 0..100 {
            fly.update(&mut camera, &keyboard, 0.1);
        }
        let forward = camera.forward();
        assert!(forward.y > 0.9);
        assert!(forward.y <= MAX_PITCH_SIN + 1e-4);
    }
}

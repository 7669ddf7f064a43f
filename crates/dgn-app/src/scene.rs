//! The demo scene: a ground plane, a few static blocks, a bouncing ball and
//! an animated sun.

use dgn_lighting::{DEFAULT_SUN_DIRECTION, DEFAULT_SUN_PERIOD, DirectionalLight, sun_direction_at};
use glam::{Mat4, Vec3, Vec4};
use tracing::warn;

/// Gravity along -Y, in units per second squared.
pub const GRAVITY: f32 = -9.81;

/// Bounces slower than this are relaunched so the demo keeps moving.
const MIN_BOUNCE_SPEED: f32 = 1.0;

/// Ground plane half extent.
pub const GROUND_HALF_EXTENT: f32 = 30.0;

/// Which shared mesh an object is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneMesh {
    Ground,
    Cube,
    Sphere,
}

#[derive(Clone, Copy, Debug)]
pub struct SceneObject {
    pub mesh: SceneMesh,
    pub model: Mat4,
    pub color: Vec4,
}

/// A sphere under gravity with a coarse ground collision: no friction, no
/// spin, and only the plane `y = ground` is solid.
#[derive(Clone, Debug)]
pub struct BouncingBall {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// Fraction of vertical speed kept on each bounce.
    pub restitution: f32,
    /// Speed the ball is thrown up with once it settles.
    pub relaunch_speed: f32,
    previous_position: Vec3,
}

impl BouncingBall {
    pub fn new(position: Vec3, radius: f32, restitution: f32, relaunch_speed: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
            restitution,
            relaunch_speed,
            previous_position: position,
        }
    }

    /// Integrate one step of `dt` seconds against a ground at height `ground`.
    pub fn step(&mut self, dt: f32, ground: f32) {
        self.previous_position = self.position;
        self.velocity.y += GRAVITY * dt;
        self.position += self.velocity * dt;

        let floor = ground + self.radius;
        if self.position.y < floor {
            self.position.y = floor;
            let bounce = -self.velocity.y * self.restitution;
            self.velocity.y = if bounce < MIN_BOUNCE_SPEED {
                self.relaunch_speed
            } else {
                bounce
            };
        }
    }

    /// Position between the last two steps, `alpha` in `[0, 1]`.
    pub fn interpolated_position(&self, alpha: f32) -> Vec3 {
        self.previous_position.lerp(self.position, alpha.clamp(0.0, 1.0))
    }
}

/// Everything the demo draws, plus the light.
pub struct DemoScene {
    pub ball: BouncingBall,
    pub sun: DirectionalLight,
    statics: Vec<SceneObject>,
}

impl DemoScene {
    pub fn new() -> Self {
        let ground = SceneObject {
            mesh: SceneMesh::Ground,
            model: Mat4::IDENTITY,
            color: Vec4::new(0.55, 0.6, 0.5, 1.0),
        };
        // A row of pillars receding from the start position, so each
        // cascade has something to shadow.
        let pillars = (0..6).map(|i| {
            let z = -4.0 - 8.0 * i as f32;
            let x = if i % 2 == 0 { -3.0 } else { 3.0 };
            SceneObject {
                mesh: SceneMesh::Cube,
                model: Mat4::from_scale_rotation_translation(
                    Vec3::new(1.0, 4.0, 1.0),
                    glam::Quat::IDENTITY,
                    Vec3::new(x, 2.0, z),
                ),
                color: Vec4::new(0.8, 0.45, 0.3, 1.0),
            }
        });
        let statics = std::iter::once(ground).chain(pillars).collect();

        Self {
            ball: BouncingBall::new(Vec3::new(0.0, 4.0, -6.0), 0.75, 0.8, 7.0),
            sun: DirectionalLight::default(),
            statics,
        }
    }

    /// One fixed simulation step at `sim_time` seconds.
    pub fn step(&mut self, dt: f32, sim_time: f32) {
        self.ball.step(dt, 0.0);
        let direction = sun_direction_at(sim_time, DEFAULT_SUN_DIRECTION, DEFAULT_SUN_PERIOD);
        if let Err(e) = self.sun.set_direction(direction) {
            warn!("Sun direction rejected: {e}");
        }
    }

    /// Objects to draw this frame, the ball interpolated by `alpha`.
    pub fn objects(&self, alpha: f32) -> Vec<SceneObject> {
        let ball = SceneObject {
            mesh: SceneMesh::Sphere,
            model: Mat4::from_translation(self.ball.interpolated_position(alpha))
                * Mat4::from_scale(Vec3::splat(self.ball.radius)),
            color: Vec4::new(0.25, 0.45, 0.85, 1.0),
        };
        self.statics
            .iter()
            .copied()
            .chain(std::iter::once(ball))
            .collect()
    }
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_falls_under_gravity() {
        let mut ball = BouncingBall::new(Vec3::new(0.0, 10.0, 0.0), 0.5, 0.8, 5.0);
        ball.step(0.1, 0.0);
        assert!(ball.velocity.y < 0.0);
        assert!(ball.position.y < 10.0);
    }

    #[test]
    fn test_ball_never_sinks_below_ground() {
        let mut ball = BouncingBall::new(Vec3::new(0.0, 3.0, 0.0), 0.5, 0.8, 5.0);
        for _ in 0..1000 {
            ball.step(1.0 / 60.0, 0.0);
            assert!(ball.position.y >= 0.5 - 1e-6);
        }
    }

    #[test]
    fn test_bounce_keeps_restitution_fraction() {
        let mut ball = BouncingBall::new(Vec3::new(0.0, 0.6, 0.0), 0.5, 0.5, 5.0);
        ball.velocity.y = -10.0;
        ball.step(0.1, 0.0);
        assert_eq!(ball.position.y, 0.5);
        let impact = 10.0 - GRAVITY * 0.1;
        assert!((ball.velocity.y - impact * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_settled_ball_is_relaunched() {
        let mut ball = BouncingBall::new(Vec3::new(0.0, 0.5, 0.0), 0.5, 0.8, 5.0);
        ball.step(1.0 / 60.0, 0.0);
        assert_eq!(ball.velocity.y, 5.0);
    }

    #[test]
    fn test_interpolation_between_steps() {
        let mut ball = BouncingBall::new(Vec3::new(0.0, 10.0, 0.0), 0.5, 0.8, 5.0);
        ball.step(0.1, 0.0);
        let mid = ball.interpolated_position(0.5);
        assert!(mid.y < 10.0 && mid.y > ball.position.y);
        assert_eq!(ball.interpolated_position(1.0), ball.position);
    }

    #[test]
    fn test_scene_sun_follows_sim_time() {
        let mut scene = DemoScene::new();
        scene.step(1.0 / 60.0, 15.0);
        let expected = sun_direction_at(15.0, DEFAULT_SUN_DIRECTION, DEFAULT_SUN_PERIOD);
        assert!(scene.sun.direction.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_scene_draws_ground_pillars_and_ball() {
        let scene = DemoScene::new();
        let objects = scene.objects(0.0);
        assert_eq!(objects[0].mesh, SceneMesh::Ground);
        assert_eq!(objects.last().map(|o| o.mesh), Some(SceneMesh::Sphere));
        assert_eq!(
            objects.iter().filter(|o| o.mesh == SceneMesh::Cube).count(),
            6
        );
    }
}

//! Directional light: the sun.
//!
//! [`DirectionalLight`] is the CPU-side description,
//! [`DirectionalLightUniform`] the GPU-side copy written each frame, and
//! [`build_directional_light_view`] the view matrix shared by every cascade.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};

use crate::error::ShadowError;

/// Reference up-axis for the light view.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Up-axis used instead of [`WORLD_UP`] when the light points straight up or
/// down.
pub const FALLBACK_UP: Vec3 = Vec3::Z;

/// Starting direction of the demo sun.
pub const DEFAULT_SUN_DIRECTION: Vec3 = Vec3::new(-1.0, -1.0, 1.0);

/// Seconds per radian of sun rotation about +Y.
pub const DEFAULT_SUN_PERIOD: f32 = 30.0;

const UNIT_TOLERANCE: f32 = 1e-3;

/// Light view matrix for a unit `direction`.
///
/// Pure rotation mapping `direction` onto +Z, with [`WORLD_UP`] kept in the
/// Y/Z plane. Light space is left-handed: depth grows away from the light.
/// When `direction` is parallel to [`WORLD_UP`], [`FALLBACK_UP`] is used.
pub fn build_directional_light_view(direction: Vec3) -> Result<Mat4, ShadowError> {
    let length = direction.length();
    if !length.is_finite() || (length - 1.0).abs() > UNIT_TOLERANCE {
        return Err(ShadowError::NonUnitLightDirection { length });
    }

    let mut right = WORLD_UP.cross(direction);
    if right.length_squared() < 1e-6 {
        right = FALLBACK_UP.cross(direction);
    }
    let right = right.normalize();
    let up = direction.cross(right);

    let face = Quat::from_mat3(&Mat3::from_cols(right, up, direction));
    Ok(Mat4::from_quat(face.conjugate()))
}

/// Sun direction after `seconds`, rotating `base` about +Y by
/// `seconds / period` radians.
pub fn sun_direction_at(seconds: f32, base: Vec3, period: f32) -> Vec3 {
    (Quat::from_rotation_y(seconds / period) * base).normalize()
}

/// CPU-side directional light description.
#[derive(Clone, Debug)]
pub struct DirectionalLight {
    /// Normalized direction the light travels in (from the light toward the
    /// scene).
    pub direction: Vec3,
    /// Linear RGB color, not premultiplied by intensity.
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: DEFAULT_SUN_DIRECTION.normalize(),
            color: Vec3::new(1.0, 0.96, 0.90),
            intensity: 1.0,
        }
    }
}

impl DirectionalLight {
    /// Set the light direction, normalizing the input.
    ///
    /// Rejects zero and non-finite vectors, leaving the light unchanged.
    pub fn set_direction(&mut self, dir: Vec3) -> Result<(), ShadowError> {
        let length = dir.length();
        if !(length.is_finite() && length > 1e-6) {
            return Err(ShadowError::NonUnitLightDirection { length });
        }
        self.direction = dir / length;
        Ok(())
    }

    /// View matrix of this light; see [`build_directional_light_view`].
    pub fn view_matrix(&self) -> Result<Mat4, ShadowError> {
        build_directional_light_view(self.direction)
    }

    /// Build the GPU-side uniform from this light's properties.
    pub fn to_uniform(&self) -> DirectionalLightUniform {
        DirectionalLightUniform {
            direction_intensity: self.direction.extend(self.intensity).to_array(),
            color_padding: self.color.extend(0.0).to_array(),
        }
    }
}

/// GPU-side representation, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = direction (normalized), w = intensity.
    pub direction_intensity: [f32; 4],
    /// xyz = color (linear RGB), w = padding.
    pub color_padding: [f32; 4],
}

//! Camera: view and projection matrices for the main pass.

use bytemuck::{Pod, Zeroable};
use dgn_lighting::Frustum;
use glam::{Mat4, Quat, Vec3};

/// A perspective camera. Looks down its local -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Field of view, clip range and viewport.
    pub frustum: Frustum,
}

/// GPU-side camera data, 144 bytes.
///
/// `view` is needed on its own so the lit shader can pick a shadow cascade
/// from view-space depth.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// xyz = world position, w = padding.
    pub camera_pos: [f32; 4],
}

impl Camera {
    /// Camera at `position` looking along `-Z`.
    pub fn new(position: Vec3, frustum: Frustum) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            frustum,
        }
    }

    /// World-to-view transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.inverse_view_matrix().inverse()
    }

    /// View-to-world transform: the camera's own placement in the world.
    pub fn inverse_view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Perspective projection with reverse-Z: near maps to 1, far to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.frustum.fov_y,
            self.frustum.aspect(),
            self.frustum.far,  // swapped for reverse-Z
            self.frustum.near, // swapped for reverse-Z
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// The right direction vector (+X in camera space).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Track a resized surface. Zero sizes (minimized window) are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.frustum.width = width as f32;
            self.frustum.height = height as f32;
        }
    }

    pub fn to_uniform(&self) -> CameraUniform {
        let view = self.view_matrix();
        CameraUniform {
            view_proj: (self.projection_matrix() * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            camera_pos: self.position.extend(0.0).to_array(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Frustum::default())
    }
}

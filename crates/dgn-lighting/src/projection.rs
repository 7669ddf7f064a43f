//! Fits an orthographic light projection around one slice of the camera
//! frustum.
//!
//! The default fit is sphere-based: the ortho box is built from a bounding
//! sphere of the slice (size does not change as the camera turns) whose
//! center is snapped to the shadow map's texel grid (edges do not crawl as
//! the camera moves).

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::BoundingSphere;
use crate::error::ShadowError;
use crate::frustum::Frustum;

/// Empirical shrink applied to the bounding-sphere radius.
///
/// Tuned by eye against the sphere's conservative size; not derived.
pub const DEFAULT_RADIUS_DIVISOR: f32 = 1.414314;

/// Default distance the light-space near plane is pulled towards the light.
pub const DEFAULT_NEAR_PULL: f32 = 10.0;

/// Size of one cascade's depth texture in texels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowMapExtent {
    pub width: u32,
    pub height: u32,
}

impl ShadowMapExtent {
    /// A `resolution` x `resolution` map.
    pub fn square(resolution: u32) -> Self {
        Self {
            width: resolution,
            height: resolution,
        }
    }

    fn validate(self) -> Result<(), ShadowError> {
        if self.width == 0 || self.height == 0 {
            return Err(ShadowError::ZeroShadowMapExtent {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// How the light-space volume is fitted around a frustum slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FitMode {
    /// Bounding sphere with texel snapping. Stable under camera motion.
    #[default]
    Sphere,
    /// Raw light-space AABB of the corners. Tighter, but the box changes
    /// size and position continuously, so shadow edges shimmer.
    Aabb,
}

/// Tunables for [`fit_cascade`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeFitParams {
    /// Extends the near plane towards the light so occluders outside the
    /// slice still cast into it.
    pub near_pull: f32,
    /// Divides the bounding-sphere radius (sphere mode only).
    pub radius_divisor: f32,
    pub fit_mode: FitMode,
}

impl Default for CascadeFitParams {
    fn default() -> Self {
        Self {
            near_pull: DEFAULT_NEAR_PULL,
            radius_divisor: DEFAULT_RADIUS_DIVISOR,
            fit_mode: FitMode::Sphere,
        }
    }
}

impl CascadeFitParams {
    pub fn validate(&self) -> Result<(), ShadowError> {
        if !(self.near_pull.is_finite() && self.near_pull >= 0.0) {
            return Err(ShadowError::InvalidFitParameter {
                name: "near_pull",
                value: self.near_pull,
            });
        }
        if !(self.radius_divisor.is_finite() && self.radius_divisor > 0.0) {
            return Err(ShadowError::InvalidFitParameter {
                name: "radius_divisor",
                value: self.radius_divisor,
            });
        }
        Ok(())
    }
}

/// Result of fitting one cascade, in light space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeFit {
    /// Center of the fitted volume (snapped in sphere mode).
    pub center: Vec3,
    /// Sphere radius after the divisor; half the box diagonal in AABB mode.
    pub radius: f32,
    pub min: Vec3,
    pub max: Vec3,
    /// Light-space size of one shadow-map texel (z is always 1).
    pub texel_size: Vec3,
    /// Depth range of the projection: `min.z - near_pull` to `max.z`.
    pub near: f32,
    pub far: f32,
}

impl CascadeFit {
    /// Left-handed orthographic projection over the fitted box, depth 0..1.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_lh(
            self.min.x, self.max.x, self.min.y, self.max.y, self.near, self.far,
        )
    }
}

/// View-space corners of `frustum` between its near and far planes.
///
/// The camera looks down -Z. Order: the four near corners, then the four
/// far corners.
pub fn frustum_slice_corners(frustum: &Frustum) -> [Vec3; 8] {
    let (tan_x, tan_y) = frustum.tan_half_fov();
    let mut corners = [Vec3::ZERO; 8];
    for (plane, distance) in [frustum.near, frustum.far].into_iter().enumerate() {
        let x = distance * tan_x;
        let y = distance * tan_y;
        let z = -distance;
        corners[plane * 4] = Vec3::new(x, -y, z);
        corners[plane * 4 + 1] = Vec3::new(x, y, z);
        corners[plane * 4 + 2] = Vec3::new(-x, -y, z);
        corners[plane * 4 + 3] = Vec3::new(-x, y, z);
    }
    corners
}

/// Frustum slice corners carried from view space through world space into
/// light space.
pub fn light_space_corners(
    camera_inverse_view: Mat4,
    light_view: Mat4,
    frustum: &Frustum,
) -> [Vec3; 8] {
    let view_to_light = light_view * camera_inverse_view;
    frustum_slice_corners(frustum)
        .map(|c| (view_to_light * Vec4::new(c.x, c.y, c.z, 1.0)).truncate())
}

/// Floors `center.x` and `center.y` onto a grid of `texel_size` cells.
///
/// `z` passes through. Axes with a non-positive cell size are left alone.
pub fn snap_to_texel_grid(center: Vec3, texel_size: Vec3) -> Vec3 {
    let snap = |v: f32, cell: f32| {
        if cell > 0.0 {
            (v / cell).floor() * cell
        } else {
            v
        }
    };
    Vec3::new(
        snap(center.x, texel_size.x),
        snap(center.y, texel_size.y),
        center.z,
    )
}

/// Fit the light-space volume for one frustum slice.
///
/// `frustum` carries the slice's near/far and the camera's field of view and
/// aspect. Fails on an unusable slice, a zero-sized map or bad tunables.
pub fn fit_cascade(
    camera_inverse_view: Mat4,
    light_view: Mat4,
    frustum: &Frustum,
    extent: ShadowMapExtent,
    params: &CascadeFitParams,
) -> Result<CascadeFit, ShadowError> {
    frustum.validate()?;
    extent.validate()?;
    params.validate()?;

    let corners = light_space_corners(camera_inverse_view, light_view, frustum);
    let (width, height) = (extent.width as f32, extent.height as f32);

    let (center, radius, min, max, texel_size) = match params.fit_mode {
        FitMode::Sphere => {
            let sphere = BoundingSphere::from_points(&corners);
            let radius = sphere.radius / params.radius_divisor;
            let texel_size = Vec3::new(2.0 * radius / width, 2.0 * radius / height, 1.0);
            let center = snap_to_texel_grid(sphere.center, texel_size);
            let half = Vec3::splat(radius);
            (center, radius, center - half, center + half, texel_size)
        }
        FitMode::Aabb => {
            let (min, max) = corners.iter().fold(
                (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                |(lo, hi), c| (lo.min(*c), hi.max(*c)),
            );
            let size = max - min;
            let texel_size = Vec3::new(size.x / width, size.y / height, 1.0);
            ((min + max) * 0.5, size.length() * 0.5, min, max, texel_size)
        }
    };

    Ok(CascadeFit {
        center,
        radius,
        min,
        max,
        texel_size,
        near: min.z - params.near_pull,
        far: max.z,
    })
}

/// Orthographic projection for one cascade; see [`fit_cascade`].
pub fn build_cascade_projection(
    camera_inverse_view: Mat4,
    light_view: Mat4,
    frustum: &Frustum,
    extent: ShadowMapExtent,
    params: &CascadeFitParams,
) -> Result<Mat4, ShadowError> {
    fit_cascade(camera_inverse_view, light_view, frustum, extent, params)
        .map(|fit| fit.projection())
}

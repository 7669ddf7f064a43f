//! Perspective viewing volume description.

use crate::error::ShadowError;

/// A symmetric perspective frustum.
///
/// `width`/`height` only contribute their ratio; the camera usually passes
/// the surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near plane distance (positive).
    pub near: f32,
    /// Far plane distance (positive, > near).
    pub far: f32,
    /// Viewport width.
    pub width: f32,
    /// Viewport height.
    pub height: f32,
}

impl Frustum {
    /// Width / height.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// The same frustum shape restricted to `[near, far]`.
    pub fn with_range(&self, near: f32, far: f32) -> Self {
        Self { near, far, ..*self }
    }

    /// `tan(fov_x / 2)` and `tan(fov_y / 2)`.
    pub fn tan_half_fov(&self) -> (f32, f32) {
        let tan_y = (self.fov_y * 0.5).tan();
        (tan_y * self.aspect(), tan_y)
    }

    /// Checks the near/far pair and the viewport shape.
    pub fn validate(&self) -> Result<(), ShadowError> {
        validate_clip_range(self.near, self.far)?;
        if !(self.width > 0.0 && self.height > 0.0 && self.fov_y > 0.0) {
            return Err(ShadowError::InvalidFrustum {
                fov_y: self.fov_y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 100.0,
            width: 1000.0,
            height: 680.0,
        }
    }
}

/// Rejects ranges that cannot describe a perspective slice.
pub(crate) fn validate_clip_range(near: f32, far: f32) -> Result<(), ShadowError> {
    if near.is_finite() && far.is_finite() && near > 0.0 && near < far {
        Ok(())
    } else {
        Err(ShadowError::InvalidClipRange { near, far })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_range_keeps_shape() {
        let f = Frustum::default().with_range(5.0, 10.0);
        assert_eq!(f.near, 5.0);
        assert_eq!(f.far, 10.0);
        assert_eq!(f.fov_y, Frustum::default().fov_y);
        assert_eq!(f.aspect(), Frustum::default().aspect());
    }

    #[test]
    fn test_horizontal_fov_follows_aspect() {
        let f = Frustum {
            width: 200.0,
            height: 100.0,
            ..Frustum::default()
        };
        let (tan_x, tan_y) = f.tan_half_fov();
        // 90 degree vertical fov
        assert!((tan_y - 1.0).abs() < 1e-6);
        assert!((tan_x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let f = Frustum::default().with_range(10.0, 5.0);
        assert!(matches!(
            f.validate(),
            Err(ShadowError::InvalidClipRange { .. })
        ));
    }

    #[test]
    fn test_zero_near_is_rejected() {
        assert!(validate_clip_range(0.0, 1.0).is_err());
        assert!(validate_clip_range(f32::NAN, 1.0).is_err());
        assert!(validate_clip_range(0.1, f32::INFINITY).is_err());
        assert!(validate_clip_range(0.1, 1.0).is_ok());
    }
}

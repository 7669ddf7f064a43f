//! Shadow pipeline error types.

use crate::light_kind::LightKind;

/// Errors raised while computing cascades or recording shadow passes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShadowError {
    /// Cascade count is zero or exceeds [`MAX_CASCADES`](crate::MAX_CASCADES).
    #[error("cascade count must be in 1..={max}, got {count}")]
    InvalidCascadeCount { count: u32, max: u32 },

    /// Near/far pair is not a usable perspective range.
    #[error("invalid clip range: near {near}, far {far} (need 0 < near < far, both finite)")]
    InvalidClipRange { near: f32, far: f32 },

    /// Field of view or viewport size is not positive.
    #[error("invalid frustum shape: fov_y {fov_y}, viewport {width}x{height}")]
    InvalidFrustum { fov_y: f32, width: f32, height: f32 },

    /// Split blend factor outside `[0, 1]`.
    #[error("split blend must be in [0, 1], got {0}")]
    InvalidSplitBlend(f32),

    /// Shadow map width or height is zero.
    #[error("shadow map extent must be non-zero, got {width}x{height}")]
    ZeroShadowMapExtent { width: u32, height: u32 },

    /// Light direction is not unit length.
    #[error("light direction must be normalized, got length {length}")]
    NonUnitLightDirection { length: f32 },

    /// A tunable fitting parameter is out of range.
    #[error("invalid fit parameter `{name}`: {value}")]
    InvalidFitParameter { name: &'static str, value: f32 },

    /// The light kind has no shadow implementation.
    #[error("{0:?} lights do not cast shadows")]
    UnsupportedLightKind(LightKind),

    /// A cascade's depth render target could not be bound or is incomplete.
    #[error("shadow cascade {cascade} render target unavailable: {reason}")]
    RenderTarget { cascade: usize, reason: String },

    /// The backend rejected a draw.
    #[error("shadow cascade {cascade} draw failed: {reason}")]
    Draw { cascade: usize, reason: String },
}

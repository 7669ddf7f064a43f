//! Directional light shadows: cascade splitting, light-space fitting and
//! shadow pass orchestration.

mod bounds;
mod cascade;
mod directional;
mod error;
mod frustum;
mod light_kind;
mod pass;
mod projection;
mod shadow;


pub use bounds::BoundingSphere;
pub use cascade::{CascadeSplitTable, MAX_CASCADES, compute_split_distances};
pub use directional::{
    DEFAULT_SUN_DIRECTION, DEFAULT_SUN_PERIOD, DirectionalLight, DirectionalLightUniform,
    FALLBACK_UP, WORLD_UP, build_directional_light_view, sun_direction_at,
};
pub use error::ShadowError;
pub use frustum::Frustum;
pub use light_kind::LightKind;
pub use pass::{DepthPassState, ShadowCaster, ShadowPassBackend};
pub use projection::{
    CascadeFit, CascadeFitParams, DEFAULT_NEAR_PULL, DEFAULT_RADIUS_DIVISOR, FitMode,
    ShadowMapExtent, build_cascade_projection, fit_cascade, frustum_slice_corners,
    light_space_corners, snap_to_texel_grid,
};
pub use shadow::{CascadeBinding, CascadedShadowConfig, ShadowCascade, ShadowSystem, ShadowUniform};

use dgn_lighting::ShadowError;
use dgn_render::{LitError, RenderContextError, ShadowMapError};

/// Errors that stop the application from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("shadow setup failed: {0}")]
    Shadow(#[from] ShadowError),

    #[error("GPU initialization failed: {0}")]
    RenderContext(#[from] RenderContextError),

    #[error("shadow map allocation failed: {0}")]
    ShadowMap(#[from] ShadowMapError),

    #[error("lit pipeline setup failed: {0}")]
    Lit(#[from] LitError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

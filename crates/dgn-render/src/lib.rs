//! wgpu rendering: device and surface setup, mesh buffers, the depth-only
//! shadow pipeline and the lit forward pipeline that samples it.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod gpu;
pub mod lit_pipeline;
pub mod pass;
pub mod primitives;
pub mod shader;
pub mod shadow_map;
pub mod shadow_pipeline;

#[cfg(test)]
mod test_device;

pub use buffer::{BufferAllocator, IndexData, MeshBuffer, MeshData, VertexPositionNormal};
pub use camera::{Camera, CameraUniform};
pub use depth::DepthBuffer;
pub use gpu::{
    RenderContext, RenderContextError, SurfaceError, init_render_context_blocking,
    shadow_sampler_features,
};
pub use lit_pipeline::{
    FIRST_CASCADE_TEXTURE_BINDING, LIT_SHADER_SOURCE, LitError, LitObject, LitPipeline,
    ObjectUniform,
};
pub use pass::{DepthAttachmentConfig, FrameEncoder, RenderPassBuilder, SKY_BLUE};
pub use shader::ShaderLibrary;
pub use shadow_map::{ShadowMapError, ShadowMapTexture, ShadowMaps, shadow_sampler_descriptor};
pub use shadow_pipeline::{
    SHADOW_SHADER_SOURCE, ShadowDrawUniform, ShadowPassRecorder, ShadowPipeline,
};

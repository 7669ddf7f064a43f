//! The render-target and draw interface the shadow orchestration drives.
//!
//! [`ShadowSystem::render`](crate::ShadowSystem::render) only sequences work;
//! a [`ShadowPassBackend`] owns the GPU resources and records the commands.

use glam::Mat4;

use crate::error::ShadowError;
use crate::projection::ShadowMapExtent;

/// Fixed-function state for one cascade's depth-only pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthPassState {
    /// Viewport and expected render-target size.
    pub extent: ShadowMapExtent,
    /// Depth the target is cleared to before drawing.
    pub clear_depth: f32,
    /// Culling front faces keeps the lit surface out of its own shadow.
    pub cull_face: wgpu::Face,
    pub depth_compare: wgpu::CompareFunction,
}

impl DepthPassState {
    /// State for a square map of `resolution` texels: clear to 1.0,
    /// front-face culling, `Less` depth test.
    pub fn for_resolution(resolution: u32) -> Self {
        Self {
            extent: ShadowMapExtent::square(resolution),
            clear_depth: 1.0,
            cull_face: wgpu::Face::Front,
            depth_compare: wgpu::CompareFunction::Less,
        }
    }
}

/// A mesh drawn into every cascade, with its model matrix.
#[derive(Debug)]
pub struct ShadowCaster<'a, M: ?Sized> {
    pub mesh: &'a M,
    pub model: Mat4,
}

impl<M: ?Sized> Clone for ShadowCaster<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized> Copy for ShadowCaster<'_, M> {}

/// Records depth-only passes into per-cascade shadow maps.
///
/// Calls arrive as `begin_cascade`, any number of `draw_caster`,
/// `end_cascade`, repeated per cascade in index order, then exactly one
/// `restore_main_target`, which is also made after a failed cascade.
pub trait ShadowPassBackend {
    type Mesh: ?Sized;

    /// Bind cascade `cascade`'s depth target, clear it, set the viewport and
    /// fixed-function state, and bind the depth-only program.
    ///
    /// Fails with [`ShadowError::RenderTarget`] if the target is missing or
    /// does not match `state.extent`.
    fn begin_cascade(&mut self, cascade: usize, state: &DepthPassState)
    -> Result<(), ShadowError>;

    /// Draw `mesh` with `model` and the cascade's composed light-space
    /// matrix.
    fn draw_caster(
        &mut self,
        mesh: &Self::Mesh,
        model: Mat4,
        light_space: Mat4,
    ) -> Result<(), ShadowError>;

    /// Finish the current cascade's pass.
    fn end_cascade(&mut self, cascade: usize) -> Result<(), ShadowError>;

    /// Rebind the main render target for the shading pass.
    fn restore_main_target(&mut self);
}

//! Depth-only render pipeline for shadow map generation.
//!
//! Renders casters from the light's point of view into one depth texture
//! per cascade. No color output, only depth writes.

use std::num::NonZeroU64;

use dgn_lighting::{CascadedShadowConfig, DepthPassState, ShadowError, ShadowPassBackend};
use glam::Mat4;

use crate::buffer::{MeshBuffer, VertexPositionNormal};
use crate::shadow_map::ShadowMaps;

/// WGSL shader source for shadow depth-only rendering.
///
/// Each draw reads its light-space and model matrices from a dynamic-offset
/// uniform slot.
pub const SHADOW_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    light_space: mat4x4<f32>,
    model: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> draw: DrawUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_shadow(in: VertexInput) -> @builtin(position) vec4<f32> {
    return draw.light_space * draw.model * vec4<f32>(in.position, 1.0);
}
"#;

/// Per-draw uniform: composed light matrix plus the caster's model matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowDrawUniform {
    pub light_space: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

impl ShadowDrawUniform {
    pub fn new(light_space: Mat4, model: Mat4) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        }
    }
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<ShadowDrawUniform>() as u64;

/// Depth-only pipeline for rendering shadow maps.
pub struct ShadowPipeline {
    pub pipeline: wgpu::RenderPipeline,
    /// Per-draw uniform layout (group 0, dynamic offset).
    pub draw_bind_group_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    slot_stride: u64,
    max_draws: u32,
    state: DepthPassState,
}

impl ShadowPipeline {
    /// Create the pipeline with depth bias from `config` and room for
    /// `max_draws` caster draws per frame, summed over all cascades.
    pub fn new(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        config: &CascadedShadowConfig,
        max_draws: u32,
    ) -> Self {
        let state = DepthPassState::for_resolution(config.resolution);
        let slot_stride = wgpu::util::align_to(
            DRAW_UNIFORM_SIZE,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let max_draws = max_draws.max(1);

        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow-draw-bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                    },
                    count: None,
                }],
            });

        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow-draw-uniforms"),
            size: slot_stride * u64::from(max_draws),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-draw-bg"),
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&draw_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-depth-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_shadow"),
                buffers: &[VertexPositionNormal::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                // The light view is left-handed, which mirrors screen-space
                // winding: world CCW triangles arrive clockwise.
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(state.cull_face),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: state.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: config.depth_bias_constant,
                    slope_scale: config.depth_bias_slope,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            draw_bind_group_layout,
            draw_buffer,
            draw_bind_group,
            slot_stride,
            max_draws,
            state,
        }
    }

    pub fn max_draws(&self) -> u32 {
        self.max_draws
    }

    /// The fixed-function state baked into the pipeline.
    pub fn state(&self) -> &DepthPassState {
        &self.state
    }
}

/// Records the cascade passes of one frame into a command encoder.
///
/// Implements [`ShadowPassBackend`] for [`ShadowSystem::render`]. Draw
/// slots are consumed in call order, so one recorder is used per frame.
///
/// [`ShadowSystem::render`]: dgn_lighting::ShadowSystem::render
pub struct ShadowPassRecorder<'a> {
    encoder: &'a mut wgpu::CommandEncoder,
    queue: &'a wgpu::Queue,
    pipeline: &'a ShadowPipeline,
    maps: &'a ShadowMaps,
    /// The open cascade pass and its index.
    pass: Option<(usize, wgpu::RenderPass<'static>)>,
    next_slot: u32,
}

impl<'a> ShadowPassRecorder<'a> {
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        queue: &'a wgpu::Queue,
        pipeline: &'a ShadowPipeline,
        maps: &'a ShadowMaps,
    ) -> Self {
        Self {
            encoder,
            queue,
            pipeline,
            maps,
            pass: None,
            next_slot: 0,
        }
    }

    /// Draws recorded so far across all cascades.
    pub fn draw_count(&self) -> u32 {
        self.next_slot
    }
}

impl ShadowPassBackend for ShadowPassRecorder<'_> {
    type Mesh = MeshBuffer;

    fn begin_cascade(
        &mut self,
        cascade: usize,
        state: &DepthPassState,
    ) -> Result<(), ShadowError> {
        let target = |reason: String| ShadowError::RenderTarget { cascade, reason };

        if self.pass.is_some() {
            return Err(target("previous cascade pass still open".into()));
        }
        let map = self
            .maps
            .cascade(cascade)
            .ok_or_else(|| target("no depth texture allocated".into()))?;
        if map.extent() != state.extent {
            return Err(target(format!(
                "depth texture is {}x{}, pass expects {}x{}",
                map.width(),
                map.height(),
                state.extent.width,
                state.extent.height
            )));
        }
        let baked = self.pipeline.state();
        if state.cull_face != baked.cull_face || state.depth_compare != baked.depth_compare {
            return Err(target("pass state differs from the depth pipeline".into()));
        }

        let mut pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow-cascade"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(state.clear_depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();
        pass.set_viewport(
            0.0,
            0.0,
            state.extent.width as f32,
            state.extent.height as f32,
            0.0,
            1.0,
        );
        pass.set_pipeline(&self.pipeline.pipeline);
        self.pass = Some((cascade, pass));
        Ok(())
    }

    fn draw_caster(
        &mut self,
        mesh: &MeshBuffer,
        model: Mat4,
        light_space: Mat4,
    ) -> Result<(), ShadowError> {
        let Some((cascade, pass)) = self.pass.as_mut() else {
            return Err(ShadowError::Draw {
                cascade: 0,
                reason: "no cascade pass open".into(),
            });
        };
        if self.next_slot >= self.pipeline.max_draws {
            return Err(ShadowError::Draw {
                cascade: *cascade,
                reason: format!(
                    "draw budget of {} exhausted at '{}'",
                    self.pipeline.max_draws, mesh.label
                ),
            });
        }

        let offset = self.pipeline.slot_stride * u64::from(self.next_slot);
        self.queue.write_buffer(
            &self.pipeline.draw_buffer,
            offset,
            bytemuck::bytes_of(&ShadowDrawUniform::new(light_space, model)),
        );
        self.next_slot += 1;

        pass.set_bind_group(0, &self.pipeline.draw_bind_group, &[offset as u32]);
        mesh.bind(pass);
        mesh.draw(pass);
        Ok(())
    }

    fn end_cascade(&mut self, cascade: usize) -> Result<(), ShadowError> {
        match self.pass.take() {
            Some((open, _)) if open == cascade => Ok(()),
            Some((open, _)) => Err(ShadowError::RenderTarget {
                cascade,
                reason: format!("cascade {open} is the open pass"),
            }),
            None => Err(ShadowError::RenderTarget {
                cascade,
                reason: "no cascade pass open".into(),
            }),
        }
    }

    fn restore_main_target(&mut self) {
        // The main pass opens its own attachments; closing any cascade
        // pass left open by an error releases the encoder for it.
        if self.pass.take().is_some() {
            log::debug!("Closed unfinished shadow cascade pass");
        }
    }
}

#[cfg(test)]
mod tests {
    use dgn_lighting::{DepthPassState, Frustum, LightKind, ShadowCaster, ShadowSystem};
    use glam::Vec3;

    use super::*;
    use crate::buffer::BufferAllocator;
    use crate::primitives;
    use crate::test_device::create_test_device;

    fn small_config() -> CascadedShadowConfig {
        CascadedShadowConfig {
            cascade_count: 2,
            resolution: 128,
            ..Default::default()
        }
    }

    fn shader(device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-test"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_SHADER_SOURCE.into()),
        })
    }

    #[test]
    fn test_draw_uniform_is_two_matrices() {
        assert_eq!(std::mem::size_of::<ShadowDrawUniform>(), 128);
        let u = ShadowDrawUniform::new(Mat4::IDENTITY, Mat4::from_translation(Vec3::X));
        assert_eq!(u.model[3][0], 1.0);
        assert_eq!(u.light_space[0][0], 1.0);
    }

    #[test]
    fn test_shader_entry_point_present() {
        assert!(SHADOW_SHADER_SOURCE.contains("fn vs_shadow"));
        assert!(!SHADOW_SHADER_SOURCE.contains("@fragment"));
    }

    #[test]
    fn test_renders_every_cascade() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let config = small_config();
        let maps = ShadowMaps::new(&device, LightKind::Directional, &config, false).unwrap();
        let pipeline = ShadowPipeline::new(&device, &shader(&device), &config, 16);
        let cube = BufferAllocator::new(&device).upload("cube", &primitives::cube(0.5));

        let frustum = Frustum {
            fov_y: 60f32.to_radians(),
            near: 0.1,
            far: 20.0,
            width: 128.0,
            height: 128.0,
        };
        let mut system = ShadowSystem::new(config, frustum.near, frustum.far).unwrap();
        system
            .update(
                Mat4::from_translation(Vec3::new(0.0, 2.0, 5.0)),
                &frustum,
                Vec3::new(-1.0, -1.0, 1.0).normalize(),
            )
            .unwrap();

        let casters = [
            ShadowCaster {
                mesh: &cube,
                model: Mat4::IDENTITY,
            },
            ShadowCaster {
                mesh: &cube,
                model: Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            },
        ];

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadow-test"),
        });
        let mut recorder = ShadowPassRecorder::new(&mut encoder, &queue, &pipeline, &maps);
        system.render(&mut recorder, &casters).unwrap();
        assert_eq!(recorder.draw_count(), 4);
        queue.submit([encoder.finish()]);
    }

    #[test]
    fn test_rejects_mismatched_targets() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let config = small_config();
        let maps = ShadowMaps::new(&device, LightKind::Directional, &config, false).unwrap();
        let pipeline = ShadowPipeline::new(&device, &shader(&device), &config, 4);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadow-test"),
        });
        let mut recorder = ShadowPassRecorder::new(&mut encoder, &queue, &pipeline, &maps);

        let wrong_size = DepthPassState::for_resolution(256);
        assert!(matches!(
            recorder.begin_cascade(0, &wrong_size),
            Err(ShadowError::RenderTarget { cascade: 0, .. })
        ));

        let state = DepthPassState::for_resolution(128);
        assert!(matches!(
            recorder.begin_cascade(2, &state),
            Err(ShadowError::RenderTarget { cascade: 2, .. })
        ));
        assert!(matches!(
            recorder.end_cascade(0),
            Err(ShadowError::RenderTarget { .. })
        ));

        let cube = BufferAllocator::new(&device).upload("cube", &primitives::cube(0.5));
        assert!(matches!(
            recorder.draw_caster(&cube, Mat4::IDENTITY, Mat4::IDENTITY),
            Err(ShadowError::Draw { .. })
        ));

        recorder.begin_cascade(0, &state).unwrap();
        recorder.restore_main_target();
        drop(recorder);
        queue.submit([encoder.finish()]);
    }

    #[test]
    fn test_draw_budget_is_enforced() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let config = small_config();
        let maps = ShadowMaps::new(&device, LightKind::Directional, &config, false).unwrap();
        let pipeline = ShadowPipeline::new(&device, &shader(&device), &config, 1);
        let cube = BufferAllocator::new(&device).upload("cube", &primitives::cube(0.5));
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadow-test"),
        });
        let mut recorder = ShadowPassRecorder::new(&mut encoder, &queue, &pipeline, &maps);

        recorder
            .begin_cascade(0, &DepthPassState::for_resolution(128))
            .unwrap();
        recorder
            .draw_caster(&cube, Mat4::IDENTITY, Mat4::IDENTITY)
            .unwrap();
        assert!(matches!(
            recorder.draw_caster(&cube, Mat4::IDENTITY, Mat4::IDENTITY),
            Err(ShadowError::Draw { .. })
        ));
        recorder.end_cascade(0).unwrap();
        recorder.restore_main_target();
        drop(recorder);
        queue.submit([encoder.finish()]);
    }
}

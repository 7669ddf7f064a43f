//! Forward lit pipeline: Lambert shading from one directional light with
//! cascaded shadow lookups.
//!
//! Bind groups:
//! - group 0: camera uniform
//! - group 1: directional light uniform
//! - group 2: shadow uniform, shadow sampler, one depth texture per cascade
//! - group 3: per-object model matrix and color (dynamic offset)

use std::num::NonZeroU64;

use dgn_lighting::{DirectionalLightUniform, MAX_CASCADES, ShadowUniform};
use glam::{Mat4, Vec4};

use crate::buffer::{MeshBuffer, VertexPositionNormal};
use crate::camera::CameraUniform;
use crate::depth::DepthBuffer;
use crate::shadow_map::ShadowMaps;

/// Binding of cascade 0's depth texture in group 2; cascade `i` is at
/// `FIRST_CASCADE_TEXTURE_BINDING + i`.
pub const FIRST_CASCADE_TEXTURE_BINDING: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum LitError {
    #[error("no shadow maps bound to the lit pipeline")]
    NoShadowMaps,

    #[error("object budget of {max} exceeded")]
    ObjectBudget { max: u32 },
}

/// Per-object uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// One mesh instance drawn by the lit pass.
#[derive(Clone, Copy, Debug)]
pub struct LitObject<'a> {
    pub mesh: &'a MeshBuffer,
    pub model: Mat4,
    pub color: Vec4,
}

impl LitObject<'_> {
    pub fn to_uniform(&self) -> ObjectUniform {
        ObjectUniform {
            model: self.model.to_cols_array_2d(),
            color: self.color.to_array(),
        }
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
    has_dynamic_offset: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Forward pipeline with its per-frame uniform buffers and bind groups.
pub struct LitPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub light_bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
    pub object_bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    shadow_buffer: wgpu::Buffer,
    object_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light_bind_group: wgpu::BindGroup,
    object_bind_group: wgpu::BindGroup,
    /// Rebuilt whenever the shadow maps are reallocated.
    shadow_bind_group: Option<wgpu::BindGroup>,
    object_stride: u64,
    max_objects: u32,
}

impl LitPipeline {
    pub fn new(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
        max_objects: u32,
    ) -> Self {
        let camera_size = std::mem::size_of::<CameraUniform>();
        let light_size = std::mem::size_of::<DirectionalLightUniform>();
        let shadow_size = std::mem::size_of::<ShadowUniform>();
        let object_size = std::mem::size_of::<ObjectUniform>();

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lit-camera-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    camera_size,
                    false,
                )],
            });

        let light_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lit-light-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    light_size,
                    false,
                )],
            });

        let mut shadow_entries = vec![
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT, shadow_size, false),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
        ];
        shadow_entries.extend((0..MAX_CASCADES as u32).map(|i| wgpu::BindGroupLayoutEntry {
            binding: FIRST_CASCADE_TEXTURE_BINDING + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let shadow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lit-shadow-bgl"),
                entries: &shadow_entries,
            });

        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lit-object-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    object_size,
                    true,
                )],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit-pipeline-layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &light_bind_group_layout,
                &shadow_bind_group_layout,
                &object_bind_group_layout,
            ],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lit-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[VertexPositionNormal::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: DepthBuffer::COMPARE_FUNCTION,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let camera_buffer = uniform_buffer(device, "lit-camera", camera_size as u64);
        let light_buffer = uniform_buffer(device, "lit-light", light_size as u64);
        let shadow_buffer = uniform_buffer(device, "lit-shadow", shadow_size as u64);

        let object_stride = wgpu::util::align_to(
            object_size as u64,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let max_objects = max_objects.max(1);
        let object_buffer =
            uniform_buffer(device, "lit-objects", object_stride * u64::from(max_objects));

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-camera-bg"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-light-bg"),
            layout: &light_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-object-bg"),
            layout: &object_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &object_buffer,
                    offset: 0,
                    size: NonZeroU64::new(object_size as u64),
                }),
            }],
        });

        Self {
            pipeline,
            camera_bind_group_layout,
            light_bind_group_layout,
            shadow_bind_group_layout,
            object_bind_group_layout,
            camera_buffer,
            light_buffer,
            shadow_buffer,
            object_buffer,
            camera_bind_group,
            light_bind_group,
            object_bind_group,
            shadow_bind_group: None,
            object_stride,
            max_objects,
        }
    }

    /// Point group 2 at `maps`. Call again after the maps are reallocated.
    pub fn bind_shadow_maps(
        &mut self,
        device: &wgpu::Device,
        maps: &ShadowMaps,
    ) -> Result<(), LitError> {
        let views = maps.binding_views().ok_or(LitError::NoShadowMaps)?;

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.shadow_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&maps.sampler),
            },
        ];
        entries.extend(views.iter().zip(0u32..).map(|(view, i)| wgpu::BindGroupEntry {
            binding: FIRST_CASCADE_TEXTURE_BINDING + i,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        self.shadow_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-shadow-bg"),
            layout: &self.shadow_bind_group_layout,
            entries: &entries,
        }));
        Ok(())
    }

    /// Upload this frame's camera, light and cascade data.
    pub fn write_frame(
        &self,
        queue: &wgpu::Queue,
        camera: &CameraUniform,
        light: &DirectionalLightUniform,
        shadow: &ShadowUniform,
    ) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(light));
        queue.write_buffer(&self.shadow_buffer, 0, bytemuck::bytes_of(shadow));
    }

    pub fn max_objects(&self) -> u32 {
        self.max_objects
    }

    /// Draw `objects` into `render_pass`, one uniform slot each.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        queue: &wgpu::Queue,
        objects: &[LitObject<'_>],
    ) -> Result<(), LitError> {
        let shadow_bind_group = self
            .shadow_bind_group
            .as_ref()
            .ok_or(LitError::NoShadowMaps)?;
        if objects.len() > self.max_objects as usize {
            return Err(LitError::ObjectBudget {
                max: self.max_objects,
            });
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.light_bind_group, &[]);
        render_pass.set_bind_group(2, shadow_bind_group, &[]);

        for (slot, object) in objects.iter().enumerate() {
            let offset = self.object_stride * slot as u64;
            queue.write_buffer(
                &self.object_buffer,
                offset,
                bytemuck::bytes_of(&object.to_uniform()),
            );
            render_pass.set_bind_group(3, &self.object_bind_group, &[offset as u32]);
            object.mesh.bind(render_pass);
            object.mesh.draw(render_pass);
        }
        Ok(())
    }
}

/// WGSL source for the lit pass.
///
/// A fragment picks the first cascade whose far distance covers its view
/// depth and compares its light-space depth against that cascade's map.
/// Anything outside the map, or past the light's far plane, is lit.
pub const LIT_SHADER_SOURCE: &str = r#"
const MAX_CASCADES: u32 = 4u;
const AMBIENT: f32 = 0.15;

struct CameraUniform {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

struct LightUniform {
    direction_intensity: vec4<f32>,
    color_padding: vec4<f32>,
};

struct ShadowUniform {
    light_matrices: array<mat4x4<f32>, MAX_CASCADES>,
    cascade_far: vec4<f32>,
    cascade_count: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

struct ObjectUniform {
    model: mat4x4<f32>,
    color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;
@group(1) @binding(0) var<uniform> sun: LightUniform;
@group(2) @binding(0) var<uniform> shadow: ShadowUniform;
@group(2) @binding(1) var shadow_sampler: sampler;
@group(2) @binding(2) var shadow_map_0: texture_depth_2d;
@group(2) @binding(3) var shadow_map_1: texture_depth_2d;
@group(2) @binding(4) var shadow_map_2: texture_depth_2d;
@group(2) @binding(5) var shadow_map_3: texture_depth_2d;
@group(3) @binding(0) var<uniform> object: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) view_depth: f32,
};

fn select_cascade(view_depth: f32) -> u32 {
    let count = min(shadow.cascade_count, MAX_CASCADES);
    for (var i = 0u; i < count; i = i + 1u) {
        if view_depth <= shadow.cascade_far[i] {
            return i;
        }
    }
    return count - 1u;
}

fn sample_cascade(cascade: u32, uv: vec2<f32>) -> f32 {
    switch cascade {
        case 0u: { return textureSampleLevel(shadow_map_0, shadow_sampler, uv, 0); }
        case 1u: { return textureSampleLevel(shadow_map_1, shadow_sampler, uv, 0); }
        case 2u: { return textureSampleLevel(shadow_map_2, shadow_sampler, uv, 0); }
        default: { return textureSampleLevel(shadow_map_3, shadow_sampler, uv, 0); }
    }
}

// 1.0 = lit, 0.0 = in shadow.
fn shadow_factor(world_pos: vec3<f32>, view_depth: f32) -> f32 {
    if shadow.cascade_count == 0u {
        return 1.0;
    }
    let cascade = select_cascade(view_depth);
    let clip = shadow.light_matrices[cascade] * vec4<f32>(world_pos, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    if any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0 {
        return 1.0;
    }
    let closest = sample_cascade(cascade, uv);
    return select(1.0, 0.0, ndc.z > closest);
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = object.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = normalize((object.model * vec4<f32>(in.normal, 0.0)).xyz);
    out.view_depth = -(camera.view * world).z;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let to_light = -normalize(sun.direction_intensity.xyz);
    let diffuse = max(dot(n, to_light), 0.0) * sun.direction_intensity.w;
    let lit = shadow_factor(in.world_pos, in.view_depth);
    let light = AMBIENT + diffuse * lit * sun.color_padding.rgb;
    return vec4<f32>(object.color.rgb * light, object.color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_device::create_test_device;

    #[test]
    fn test_shader_cascade_limit_matches() {
        let decl = format!("const MAX_CASCADES: u32 = {MAX_CASCADES}u;");
        assert!(LIT_SHADER_SOURCE.contains(&decl));
    }

    #[test]
    fn test_shader_declares_every_cascade_binding() {
        for i in 0..MAX_CASCADES as u32 {
            let decl = format!(
                "@group(2) @binding({}) var shadow_map_{i}: texture_depth_2d;",
                FIRST_CASCADE_TEXTURE_BINDING + i
            );
            assert!(LIT_SHADER_SOURCE.contains(&decl), "missing {decl}");
        }
    }

    #[test]
    fn test_object_uniform_layout() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 80);
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 288);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }

    #[test]
    fn test_pipeline_builds_and_binds_maps() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit-test"),
            source: wgpu::ShaderSource::Wgsl(LIT_SHADER_SOURCE.into()),
        });
        let mut lit = LitPipeline::new(&device, &shader, wgpu::TextureFormat::Bgra8UnormSrgb, 8);
        assert_eq!(lit.max_objects(), 8);

        let config = dgn_lighting::CascadedShadowConfig {
            cascade_count: 3,
            resolution: 64,
            ..Default::default()
        };
        let maps = ShadowMaps::new(&device, dgn_lighting::LightKind::Directional, &config, false)
            .unwrap();
        lit.bind_shadow_maps(&device, &maps).unwrap();
        assert!(lit.shadow_bind_group.is_some());
    }
}

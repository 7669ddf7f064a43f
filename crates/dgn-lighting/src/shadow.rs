//! Cascaded shadow maps for the directional light.
//!
//! Splits the camera frustum into depth slices (cascades), each with its own
//! shadow map covering a progressively larger area at the same resolution.
//! [`ShadowSystem`] owns the split table and per-cascade matrices and drives
//! a [`ShadowPassBackend`] to render them.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::cascade::{CascadeSplitTable, MAX_CASCADES, compute_split_distances};
use crate::directional::build_directional_light_view;
use crate::error::ShadowError;
use crate::frustum::Frustum;
use crate::light_kind::LightKind;
use crate::pass::{DepthPassState, ShadowCaster, ShadowPassBackend};
use crate::projection::{
    CascadeFitParams, DEFAULT_NEAR_PULL, DEFAULT_RADIUS_DIVISOR, FitMode, ShadowMapExtent,
    build_cascade_projection,
};

/// Configuration for cascaded shadow mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadedShadowConfig {
    /// Number of cascades, `1..=MAX_CASCADES`. Default: 3.
    pub cascade_count: u32,
    /// Shadow map resolution (width = height) per cascade. Default: 2048.
    pub resolution: u32,
    /// 0 = logarithmic splits, 1 = uniform. Default: 0.45.
    pub split_blend: f32,
    /// Light-space near plane extension towards the light.
    pub near_pull: f32,
    /// Bounding-sphere radius shrink.
    pub radius_divisor: f32,
    pub fit_mode: FitMode,
    /// Constant depth bias, in depth-buffer units.
    pub depth_bias_constant: i32,
    /// Slope-scaled depth bias.
    pub depth_bias_slope: f32,
}

impl Default for CascadedShadowConfig {
    fn default() -> Self {
        Self {
            cascade_count: 3,
            resolution: 2048,
            split_blend: 0.45,
            near_pull: DEFAULT_NEAR_PULL,
            radius_divisor: DEFAULT_RADIUS_DIVISOR,
            fit_mode: FitMode::Sphere,
            depth_bias_constant: 2,
            depth_bias_slope: 1.75,
        }
    }
}

impl CascadedShadowConfig {
    pub fn fit_params(&self) -> CascadeFitParams {
        CascadeFitParams {
            near_pull: self.near_pull,
            radius_divisor: self.radius_divisor,
            fit_mode: self.fit_mode,
        }
    }

    pub fn extent(&self) -> ShadowMapExtent {
        ShadowMapExtent::square(self.resolution)
    }

    /// Checks everything that does not depend on the camera.
    pub fn validate(&self) -> Result<(), ShadowError> {
        if self.cascade_count == 0 || self.cascade_count as usize > MAX_CASCADES {
            return Err(ShadowError::InvalidCascadeCount {
                count: self.cascade_count,
                max: MAX_CASCADES as u32,
            });
        }
        if self.resolution == 0 {
            return Err(ShadowError::ZeroShadowMapExtent {
                width: 0,
                height: 0,
            });
        }
        if !(0.0..=1.0).contains(&self.split_blend) {
            return Err(ShadowError::InvalidSplitBlend(self.split_blend));
        }
        if !self.depth_bias_slope.is_finite() {
            return Err(ShadowError::InvalidFitParameter {
                name: "depth_bias_slope",
                value: self.depth_bias_slope,
            });
        }
        self.fit_params().validate()
    }
}

/// GPU-side shadow uniform read by the lit shader.
///
/// `MAX_CASCADES` light-space matrices, cascade far distances and the
/// active cascade count. 4×64 + 16 + 16 = 288 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ShadowUniform {
    /// Light-space view-projection matrix per cascade.
    pub light_matrices: [[f32; 16]; MAX_CASCADES],
    /// View-space far distance per cascade (vec4).
    pub cascade_far: [f32; MAX_CASCADES],
    /// Number of active cascades, plus 3 padding u32s.
    pub cascade_count_pad: [u32; 4],
}

const _: () = assert!(std::mem::size_of::<ShadowUniform>() % 16 == 0);

/// Matrices of one cascade. The depth texture lives with the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowCascade {
    /// Light view, identical for every cascade of a light.
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
}

impl Default for ShadowCascade {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        }
    }
}

impl ShadowCascade {
    /// `projection × view`: world space to the cascade's clip space.
    pub fn light_space_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }
}

/// What the shading pass needs for cascade `index`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeBinding {
    pub index: usize,
    pub light_space: Mat4,
    /// View-space far distance; fragments nearer than this use this cascade.
    pub far: f32,
}

/// Per-light cascade state, recomputed each frame.
#[derive(Clone, Debug)]
pub struct ShadowSystem {
    config: CascadedShadowConfig,
    light_kind: LightKind,
    splits: CascadeSplitTable,
    cascades: Vec<ShadowCascade>,
    /// Whether `cascades` were fitted for the current configuration.
    fitted: bool,
}

impl ShadowSystem {
    /// Shadow state for a directional light and a camera clipping
    /// `[near, far]`.
    pub fn new(config: CascadedShadowConfig, near: f32, far: f32) -> Result<Self, ShadowError> {
        Self::with_light_kind(config, LightKind::Directional, near, far)
    }

    /// As [`ShadowSystem::new`], rejecting kinds without a shadow path.
    pub fn with_light_kind(
        config: CascadedShadowConfig,
        light_kind: LightKind,
        near: f32,
        far: f32,
    ) -> Result<Self, ShadowError> {
        light_kind.shadow_map_format()?;
        config.validate()?;
        let splits = compute_split_distances(config.cascade_count, near, far, config.split_blend)?;
        log::info!(
            "Shadow cascades: count={}, resolution={}, splits={:?}",
            config.cascade_count,
            config.resolution,
            splits.distances()
        );
        let cascades = vec![ShadowCascade::default(); config.cascade_count as usize];
        Ok(Self {
            config,
            light_kind,
            splits,
            cascades,
            fitted: false,
        })
    }

    /// Swap in a new configuration, recomputing splits for the current clip
    /// range. On error the previous state is kept.
    ///
    /// The cascades are unfitted afterwards: nothing is rendered or bound
    /// until the next successful [`update`](Self::update).
    pub fn reconfigure(&mut self, config: CascadedShadowConfig) -> Result<(), ShadowError> {
        config.validate()?;
        let splits = compute_split_distances(
            config.cascade_count,
            self.splits.near(),
            self.splits.far(),
            config.split_blend,
        )?;
        self.cascades
            .resize(config.cascade_count as usize, ShadowCascade::default());
        self.splits = splits;
        self.config = config;
        self.fitted = false;
        Ok(())
    }

    pub fn config(&self) -> &CascadedShadowConfig {
        &self.config
    }

    pub fn light_kind(&self) -> LightKind {
        self.light_kind
    }

    pub fn splits(&self) -> &CascadeSplitTable {
        &self.splits
    }

    /// Cascades from nearest to farthest.
    pub fn cascades(&self) -> &[ShadowCascade] {
        &self.cascades
    }

    pub fn cascade_count(&self) -> usize {
        self.cascades.len()
    }

    /// True once [`update`](Self::update) has fitted every cascade for the
    /// current configuration.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fit every cascade to the current camera and light.
    ///
    /// `camera_inverse_view` maps camera view space to world space; `frustum`
    /// is the camera's full frustum. Splits are recomputed if its near/far
    /// changed. Nothing is modified on error.
    pub fn update(
        &mut self,
        camera_inverse_view: Mat4,
        frustum: &Frustum,
        light_direction: Vec3,
    ) -> Result<(), ShadowError> {
        frustum.validate()?;
        let splits = if frustum.near != self.splits.near() || frustum.far != self.splits.far() {
            let splits = compute_split_distances(
                self.config.cascade_count,
                frustum.near,
                frustum.far,
                self.config.split_blend,
            )?;
            log::debug!("Shadow splits recomputed: {:?}", splits.distances());
            Some(splits)
        } else {
            None
        };
        let table = splits.as_ref().unwrap_or(&self.splits);

        let light_view = build_directional_light_view(light_direction)?;
        let params = self.config.fit_params();
        let extent = self.config.extent();

        let cascades = (0..table.cascade_count())
            .map(|i| {
                let (near, far) = table.range(i);
                let projection = build_cascade_projection(
                    camera_inverse_view,
                    light_view,
                    &frustum.with_range(near, far),
                    extent,
                    &params,
                )?;
                Ok::<_, ShadowError>(ShadowCascade {
                    view_matrix: light_view,
                    projection_matrix: projection,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(splits) = splits {
            self.splits = splits;
        }
        self.cascades = cascades;
        self.fitted = true;
        Ok(())
    }

    /// Render every cascade's depth pass, then hand the main target back.
    ///
    /// The first backend error aborts the remaining cascades of this frame
    /// and is returned; the main target is restored either way. Unfitted
    /// cascades are skipped.
    pub fn render<B: ShadowPassBackend>(
        &self,
        backend: &mut B,
        casters: &[ShadowCaster<'_, B::Mesh>],
    ) -> Result<(), ShadowError> {
        if !self.fitted {
            log::debug!("Shadow cascades not fitted yet, skipping depth passes");
            backend.restore_main_target();
            return Ok(());
        }
        let result = self.render_cascades(backend, casters);
        backend.restore_main_target();
        if let Err(err) = &result {
            log::error!("Shadow pass aborted: {err}");
        }
        result
    }

    fn render_cascades<B: ShadowPassBackend>(
        &self,
        backend: &mut B,
        casters: &[ShadowCaster<'_, B::Mesh>],
    ) -> Result<(), ShadowError> {
        let state = DepthPassState::for_resolution(self.config.resolution);
        for (i, cascade) in self.cascades.iter().enumerate() {
            let light_space = cascade.light_space_matrix();
            backend.begin_cascade(i, &state)?;
            for caster in casters {
                backend.draw_caster(caster.mesh, caster.model, light_space)?;
            }
            backend.end_cascade(i)?;
        }
        Ok(())
    }

    /// Per-cascade data for the shading pass, nearest first. Empty until
    /// the cascades are fitted.
    pub fn cascade_bindings(&self) -> Vec<CascadeBinding> {
        if !self.fitted {
            return Vec::new();
        }
        self.cascades
            .iter()
            .enumerate()
            .map(|(index, cascade)| CascadeBinding {
                index,
                light_space: cascade.light_space_matrix(),
                far: self.splits.cascade_far(index),
            })
            .collect()
    }

    /// GPU uniform; unused slots hold identity matrices and zero distances.
    /// The cascade count is 0 while unfitted, so shading treats everything
    /// as lit.
    pub fn to_uniform(&self) -> ShadowUniform {
        let bindings = self.cascade_bindings();
        let mut uniform = ShadowUniform {
            light_matrices: [Mat4::IDENTITY.to_cols_array(); MAX_CASCADES],
            cascade_far: [0.0; MAX_CASCADES],
            cascade_count_pad: [bindings.len() as u32, 0, 0, 0],
        };
        for binding in bindings {
            uniform.light_matrices[binding.index] = binding.light_space.to_cols_array();
            uniform.cascade_far[binding.index] = binding.far;
        }
        uniform
    }
}

//! Depth textures the shadow cascades render into.
//!
//! One 2D depth texture per cascade plus a shared point sampler. The lit
//! shader binds each cascade's texture at its own binding slot, so the
//! cascade index doubles as the slot offset.

use dgn_lighting::{CascadedShadowConfig, LightKind, MAX_CASCADES, ShadowError, ShadowMapExtent};

#[derive(Debug, thiserror::Error)]
pub enum ShadowMapError {
    #[error(transparent)]
    Shadow(#[from] ShadowError),

    #[error("shadow map resolution {resolution} exceeds device limit {max}")]
    TooLarge { resolution: u32, max: u32 },
}

/// A single depth render target, sampled later by the lit pass.
pub struct ShadowMapTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl ShadowMapTexture {
    /// Create a depth texture in the format `kind` stores shadows in.
    ///
    /// No mipmaps; usable as render attachment and sampled texture.
    pub fn new(
        device: &wgpu::Device,
        kind: LightKind,
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self, ShadowMapError> {
        let format = kind.shadow_map_format()?;
        if width == 0 || height == 0 {
            return Err(ShadowError::ZeroShadowMapExtent { width, height }.into());
        }
        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(ShadowMapError::TooLarge {
                resolution: width.max(height),
                max,
            });
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> ShadowMapExtent {
        ShadowMapExtent {
            width: self.width,
            height: self.height,
        }
    }
}

/// All cascades' depth textures for one light, nearest cascade first.
pub struct ShadowMaps {
    kind: LightKind,
    cascades: Vec<ShadowMapTexture>,
    pub sampler: wgpu::Sampler,
}

impl ShadowMaps {
    /// Allocate `config.cascade_count` square maps of `config.resolution`.
    ///
    /// With `clamp_to_border` the sampler returns the light kind's border
    /// color (depth 1.0, lit) outside the map; otherwise it clamps to the
    /// edge and the shader's own bounds check keeps outside lookups lit.
    pub fn new(
        device: &wgpu::Device,
        kind: LightKind,
        config: &CascadedShadowConfig,
        clamp_to_border: bool,
    ) -> Result<Self, ShadowMapError> {
        config.validate()?;
        let cascades = (0..config.cascade_count)
            .map(|i| {
                ShadowMapTexture::new(
                    device,
                    kind,
                    config.resolution,
                    config.resolution,
                    &format!("shadow-cascade-{i}"),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sampler = device.create_sampler(&shadow_sampler_descriptor(kind, clamp_to_border)?);

        log::info!(
            "Allocated {} shadow maps of {}x{} (border clamp: {clamp_to_border})",
            cascades.len(),
            config.resolution,
            config.resolution
        );

        Ok(Self {
            kind,
            cascades,
            sampler,
        })
    }

    pub fn light_kind(&self) -> LightKind {
        self.kind
    }

    pub fn cascade_count(&self) -> usize {
        self.cascades.len()
    }

    /// The depth texture of `cascade`, if allocated.
    pub fn cascade(&self, cascade: usize) -> Option<&ShadowMapTexture> {
        self.cascades.get(cascade)
    }

    /// A view for every shader binding slot. Slots past the allocated
    /// cascades repeat the last map; the shader never samples them.
    pub fn binding_views(&self) -> Option<[&wgpu::TextureView; MAX_CASCADES]> {
        let last = self.cascades.last()?;
        Some(std::array::from_fn(|i| {
            &self.cascades.get(i).unwrap_or(last).view
        }))
    }
}

/// Point sampling, no mips, border = the light kind's border color.
pub fn shadow_sampler_descriptor(
    kind: LightKind,
    clamp_to_border: bool,
) -> Result<wgpu::SamplerDescriptor<'static>, ShadowError> {
    let border = kind.shadow_border_color()?;
    let (address_mode, border_color) = if clamp_to_border {
        (wgpu::AddressMode::ClampToBorder, Some(border))
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };
    Ok(wgpu::SamplerDescriptor {
        label: Some("shadow-sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_device::create_test_device;

    #[test]
    fn test_sampler_uses_white_border_when_supported() {
        let desc = shadow_sampler_descriptor(LightKind::Directional, true).unwrap();
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::ClampToBorder);
        assert_eq!(desc.border_color, Some(wgpu::SamplerBorderColor::OpaqueWhite));
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Nearest);
        assert!(desc.compare.is_none());
    }

    #[test]
    fn test_sampler_falls_back_to_edge_clamp() {
        let desc = shadow_sampler_descriptor(LightKind::Directional, false).unwrap();
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
        assert!(desc.border_color.is_none());
    }

    #[test]
    fn test_sampler_rejects_point_lights() {
        assert!(shadow_sampler_descriptor(LightKind::Point, true).is_err());
    }

    #[test]
    fn test_texture_matches_requested_size() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let map =
            ShadowMapTexture::new(&device, LightKind::Directional, 512, 256, "test").unwrap();
        assert_eq!(map.width(), 512);
        assert_eq!(map.height(), 256);
        assert_eq!(map.texture.format(), wgpu::TextureFormat::Depth32Float);
        assert_eq!(map.texture.mip_level_count(), 1);
        let usage = map.texture.usage();
        assert!(usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
        assert!(usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
    }

    #[test]
    fn test_texture_rejects_bad_requests() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        assert!(matches!(
            ShadowMapTexture::new(&device, LightKind::Directional, 0, 512, "zero"),
            Err(ShadowMapError::Shadow(ShadowError::ZeroShadowMapExtent { .. }))
        ));
        assert!(matches!(
            ShadowMapTexture::new(&device, LightKind::Spot, 512, 512, "spot"),
            Err(ShadowMapError::Shadow(ShadowError::UnsupportedLightKind(
                LightKind::Spot
            )))
        ));
        assert!(matches!(
            ShadowMapTexture::new(&device, LightKind::Directional, u32::MAX, 1, "huge"),
            Err(ShadowMapError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_maps_allocate_one_texture_per_cascade() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let config = CascadedShadowConfig {
            cascade_count: 2,
            resolution: 256,
            ..Default::default()
        };
        let maps = ShadowMaps::new(&device, LightKind::Directional, &config, false).unwrap();
        assert_eq!(maps.cascade_count(), 2);
        assert!(maps.cascade(1).is_some());
        assert!(maps.cascade(2).is_none());
        assert!(maps.binding_views().is_some());
    }
}

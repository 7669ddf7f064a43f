//! Light kinds and their shadow-map storage requirements.

use crate::error::ShadowError;

/// The kind of light a shadow map is allocated for.
///
/// Only [`LightKind::Directional`] has a shadow implementation. New kinds
/// extend this enum and the match arms below.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Infinitely distant light (the sun). Uses cascaded orthographic maps.
    #[default]
    Directional,
    /// Omnidirectional light with a position.
    Point,
    /// Cone light with a position and direction.
    Spot,
}

impl LightKind {
    /// Depth format of this light's shadow maps.
    pub fn shadow_map_format(self) -> Result<wgpu::TextureFormat, ShadowError> {
        match self {
            LightKind::Directional => Ok(wgpu::TextureFormat::Depth32Float),
            LightKind::Point | LightKind::Spot => Err(ShadowError::UnsupportedLightKind(self)),
        }
    }

    /// Border color sampled outside the shadow map.
    ///
    /// Opaque white is depth 1.0, the far plane, so geometry outside the map
    /// reads as lit.
    pub fn shadow_border_color(self) -> Result<wgpu::SamplerBorderColor, ShadowError> {
        match self {
            LightKind::Directional => Ok(wgpu::SamplerBorderColor::OpaqueWhite),
            LightKind::Point | LightKind::Spot => Err(ShadowError::UnsupportedLightKind(self)),
        }
    }

    /// Whether this kind can cast shadows in the current pipeline.
    pub fn casts_shadows(self) -> bool {
        self.shadow_map_format().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_uses_depth32float() {
        assert_eq!(
            LightKind::Directional.shadow_map_format(),
            Ok(wgpu::TextureFormat::Depth32Float)
        );
    }

    #[test]
    fn test_point_and_spot_are_rejected() {
        for kind in [LightKind::Point, LightKind::Spot] {
            assert_eq!(
                kind.shadow_map_format(),
                Err(ShadowError::UnsupportedLightKind(kind))
            );
            assert!(!kind.casts_shadows());
        }
    }

    #[test]
    fn test_directional_border_is_white() {
        assert_eq!(
            LightKind::Directional.shadow_border_color(),
            Ok(wgpu::SamplerBorderColor::OpaqueWhite)
        );
    }

    #[test]
    fn test_default_is_directional() {
        assert_eq!(LightKind::default(), LightKind::Directional);
    }
}

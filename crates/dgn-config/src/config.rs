//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use dgn_lighting::{CascadedShadowConfig, FitMode};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub shadow: ShadowConfig,
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    pub title: String,
}

/// Camera projection and fly-controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub look_speed: f32,
}

/// Fit mode as written in `config.ron`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShadowFitMode {
    /// Texel-snapped bounding sphere; stable under camera motion.
    #[default]
    Sphere,
    /// Tight light-space box; sharper but shimmers.
    Aabb,
}

impl From<ShadowFitMode> for FitMode {
    fn from(mode: ShadowFitMode) -> Self {
        match mode {
            ShadowFitMode::Sphere => FitMode::Sphere,
            ShadowFitMode::Aabb => FitMode::Aabb,
        }
    }
}

/// Cascaded shadow map settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowConfig {
    pub cascade_count: u32,
    /// Width and height of each cascade's depth texture.
    pub resolution: u32,
    /// 0.0 = logarithmic splits, 1.0 = uniform.
    pub split_blend: f32,
    /// Distance the light's near plane is pulled towards the light, so
    /// casters outside the camera frustum still land in the map.
    pub near_pull: f32,
    pub radius_divisor: f32,
    pub fit_mode: ShadowFitMode,
    pub depth_bias_constant: i32,
    pub depth_bias_slope: f32,
}

impl ShadowConfig {
    /// The lighting crate's view of these settings. Not validated here;
    /// [`CascadedShadowConfig::validate`] runs when the shadow system is built.
    pub fn to_cascaded(&self) -> CascadedShadowConfig {
        CascadedShadowConfig {
            cascade_count: self.cascade_count,
            resolution: self.resolution,
            split_blend: self.split_blend,
            near_pull: self.near_pull,
            radius_divisor: self.radius_divisor,
            fit_mode: self.fit_mode.into(),
            depth_bias_constant: self.depth_bias_constant,
            depth_bias_slope: self.depth_bias_slope,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 680,
            vsync: true,
            title: "DGN Engine".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 90.0,
            near: 0.1,
            far: 100.0,
            move_speed: 3.0,
            look_speed: std::f32::consts::PI,
        }
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        let defaults = CascadedShadowConfig::default();
        Self {
            cascade_count: defaults.cascade_count,
            resolution: defaults.resolution,
            split_blend: defaults.split_blend,
            near_pull: defaults.near_pull,
            radius_divisor: defaults.radius_divisor,
            fit_mode: ShadowFitMode::Sphere,
            depth_bias_constant: defaults.depth_bias_constant,
            depth_bias_slope: defaults.depth_bias_slope,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// `dirs::config_dir()/dgn`, if the platform has a config directory.
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dgn"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join("config.ron");
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join("config.ron"))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

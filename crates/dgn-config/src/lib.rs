//! Engine configuration.
//!
//! Settings persist to disk as RON and can be overridden from the command
//! line. Unknown and missing fields fall back to defaults, so old config
//! files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CameraConfig, Config, DebugConfig, ShadowConfig, ShadowFitMode, WindowConfig};
pub use error::ConfigError;

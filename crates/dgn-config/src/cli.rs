//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// DGN engine command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "dgn", about = "Cascaded shadow mapping demo")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of shadow cascades (1-4).
    #[arg(long)]
    pub cascades: Option<u32>,

    /// Shadow map resolution per cascade.
    #[arg(long)]
    pub shadow_resolution: Option<u32>,

    /// Split blend: 0 = logarithmic, 1 = uniform.
    #[arg(long)]
    pub split_blend: Option<f32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(count) = args.cascades {
            self.shadow.cascade_count = count;
        }
        if let Some(resolution) = args.shadow_resolution {
            self.shadow.resolution = resolution;
        }
        if let Some(blend) = args.split_blend {
            self.shadow.split_blend = blend;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

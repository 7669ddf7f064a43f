//! The binary entry point for the DGN Engine demo.

use clap::Parser;
use dgn_config::{CliArgs, Config};

fn main() {
    let args = CliArgs::parse();
    let config_dir = args.config.clone().or_else(Config::default_dir);

    let mut config = match &config_dir {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {e}");
            Config::default()
        }),
        None => {
            eprintln!("No config directory available, using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    dgn_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    if let Err(e) = dgn_app::run(config, config_dir) {
        tracing::error!("{e}");
        eprintln!("DGN Engine exited with an error: {e}");
        std::process::exit(1);
    }
}

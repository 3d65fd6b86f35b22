use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info};

use crate::config::ServiceConfig;

/// Overrides `scratch_dir`.
pub const ENV_SCRATCH_DIR: &str = "FILE_CONVERTER_SCRATCH_DIR";
/// Overrides `office_converter.program`.
pub const ENV_OFFICE_PROGRAM: &str = "FILE_CONVERTER_OFFICE_PROGRAM";

/// Loads a YAML config file, or the defaults when `path` is `None`, then
/// applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path.as_ref())?,
        None => {
            info!("No config file given, using defaults");
            ServiceConfig::default()
        }
    };

    if let Ok(dir) = std::env::var(ENV_SCRATCH_DIR) {
        info!(scratch_dir = %dir, "Scratch dir overridden from env");
        config.scratch_dir = dir.into();
    }
    if let Ok(program) = std::env::var(ENV_OFFICE_PROGRAM) {
        info!(program = %program, "Office converter program overridden from env");
        config.office_converter.program = program;
    }

    for (field, value) in [
        ("max_source_bytes", config.max_source_bytes),
        ("download_timeout_secs", config.download_timeout_secs),
        ("office_timeout_secs", config.office_timeout_secs),
    ] {
        if value == 0 {
            error!(field, "Config value must be positive");
            anyhow::bail!("{field} must be positive");
        }
    }

    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ServiceConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    match serde_yaml::from_str::<ServiceConfig>(&content) {
        Ok(config) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

//! `load_config` module: reads the YAML config file into a [`PipelineConfig`].
//!
//! This is the only place where user-supplied YAML is parsed. Relative paths
//! are resolved against the config file's directory so the tool behaves the
//! same from any working directory. The generation API key is not part of the
//! file; see [`crate::generate::ChatClient::new_from_env`].
//!
//! All errors are `anyhow::Error` with context and surface at the CLI boundary.
use anyhow::Result;
use docpress_core::config::PipelineConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads, resolves and validates the config at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: PipelineConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let base = match path_ref.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let config = raw.resolve_relative_to(&base);
    if let Err(e) = config.validate() {
        error!(error = %e, config_path = ?path_ref, "Config failed validation");
        return Err(anyhow::anyhow!("Invalid config {:?}: {e}", path_ref));
    }
    config.trace_loaded();
    Ok(config)
}

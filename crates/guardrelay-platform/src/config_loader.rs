//! `config.json` discovery and loading.
//!
//! The path is taken from the `GUARDRELAY_CONFIG` environment variable, or
//! `config.json` in the working directory. A missing file is not an error:
//! a default config is written in its place and used. A file that exists
//! but cannot be read or parsed aborts the run.

use std::path::{Path, PathBuf};

use serde::Serialize;

use guardrelay_types::config::RelayConfig;
use guardrelay_types::error::{RelayError, Result};

use crate::env::Environment;

/// Environment variable that overrides the config location.
pub const CONFIG_ENV_VAR: &str = "GUARDRELAY_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Resolve the config path.
pub fn discover_config_path(env: &dyn Environment) -> PathBuf {
    match env.get_var(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Load and validate the config at `path`, creating a default one first if
/// the file does not exist.
pub async fn load_or_create(path: &Path) -> Result<RelayConfig> {
    let config = match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "loading config file");
            serde_json::from_str::<RelayConfig>(&contents).map_err(|e| {
                RelayError::ConfigInvalid {
                    reason: format!("failed to parse {}: {e}", path.display()),
                }
            })?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = RelayConfig::default();
            write_config(path, &config).await?;
            tracing::info!(path = %path.display(), "created default config file");
            config
        }
        Err(e) => {
            return Err(RelayError::ConfigInvalid {
                reason: format!("failed to read {}: {e}", path.display()),
            });
        }
    };

    config.validate()?;
    Ok(config)
}

/// Write `config` as 4-space indented JSON.
pub async fn write_config(path: &Path, config: &RelayConfig) -> Result<()> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    config.serialize(&mut ser)?;
    out.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, out).await.map_err(|e| RelayError::ConfigInvalid {
        reason: format!("failed to create {}: {e}", path.display()),
    })
}

//! Configuration loader for Huddle.
//!
//! Reads `config.toml` from the data directory (`~/.huddle/` in production)
//! and deserializes it into [`HuddleConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use huddle_types::config::HuddleConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `HUDDLE_DATA_DIR` environment variable
/// 2. `~/.huddle`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HUDDLE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".huddle");
    }

    PathBuf::from(".huddle")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`HuddleConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> HuddleConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return HuddleConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return HuddleConfig::default();
        }
    };

    match toml::from_str::<HuddleConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            HuddleConfig::default()
        }
    }
}

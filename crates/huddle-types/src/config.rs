//! Global configuration types for Huddle.
//!
//! `HuddleConfig` represents the top-level `config.toml` that controls
//! mailbox retention, the default language, the web listener and the
//! Spyfall location deck.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuddleConfig {
    /// Maximum number of mailbox messages kept per web guest.
    #[serde(default = "default_mailbox_retention")]
    pub mailbox_retention: u32,

    /// Language used when a user has none set or a key is missing.
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory holding `{lang}.toml` translation tables.
    #[serde(default)]
    pub translations_dir: Option<PathBuf>,

    /// Locations dealt by a Spyfall round.
    #[serde(default)]
    pub spyfall_locations: Vec<SpyfallLocation>,
}

/// One Spyfall location and the roles its non-spy players can draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyfallLocation {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_mailbox_retention() -> u32 {
    10
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for HuddleConfig {
    fn default() -> Self {
        Self {
            mailbox_retention: default_mailbox_retention(),
            default_language: default_language(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            translations_dir: None,
            spyfall_locations: Vec::new(),
        }
    }
}

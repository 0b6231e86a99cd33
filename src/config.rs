use crate::error::{NegotiationError, Result};
use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub negotiation: NegotiationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NegotiationConfig {
    /// Business-level hold TTL; expiry is checked lazily on next access.
    #[serde(default = "default_hold_ttl_hours")]
    pub hold_ttl_hours: i64,
}

fn default_hold_ttl_hours() -> i64 {
    168
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            hold_ttl_hours: default_hold_ttl_hours(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            negotiation: NegotiationConfig::default(),
        }
    }
}

impl Config {
    /// Load from config.toml next to the binary; a missing file falls back
    /// to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_content = match fs::read_to_string(config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(NegotiationError::Persistence(format!(
                    "failed to read config file '{}': {}",
                    config_path.display(),
                    e
                )));
            }
        };

        toml::from_str(&config_content).map_err(|e| {
            NegotiationError::Persistence(format!(
                "failed to parse '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    pub fn hold_ttl(&self) -> Duration {
        Duration::hours(self.negotiation.hold_ttl_hours)
    }
}

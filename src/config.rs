use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BotError, Result};

/// Shortest accepted periodic refresh interval
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;

/// Bot configuration, loaded from an optional JSON file and overridden by
/// command-line flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Activity ("playing ...") shown once the bot is ready
    #[serde(default)]
    pub activity: Option<String>,

    /// Seconds between full cache refreshes, 0 disables
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Register slash commands per guild instead of globally
    #[serde(default)]
    pub guild_commands: bool,

    /// Channel to use as main channel instead of the automatic choice
    #[serde(default)]
    pub main_channel: Option<u64>,
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            activity: None,
            refresh_interval_secs: default_refresh_interval(),
            guild_commands: false,
            main_channel: None,
        }
    }
}

impl BotConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs != 0 && self.refresh_interval_secs < MIN_REFRESH_INTERVAL_SECS
        {
            return Err(BotError::ConfigValidation {
                message: format!(
                    "refresh_interval_secs must be 0 or at least {}, got {}",
                    MIN_REFRESH_INTERVAL_SECS, self.refresh_interval_secs
                ),
            });
        }
        if self.main_channel == Some(0) {
            return Err(BotError::ConfigValidation {
                message: "main_channel must be a non-zero channel id".to_string(),
            });
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;
const DEFAULT_USER_AGENT: &str = "AudioStreamer";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Period of the progress tracker while playing
    #[serde(rename = "progress_interval_ms", with = "duration_ms")]
    pub progress_interval: Duration,
    /// User agent handed to the engine for network sources
    pub user_agent: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from the environment.
    /// In debug builds a `.env` file is loaded first, if present.
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                info!("Config: loaded .env file");
            } else {
                tracing::debug!("Config: no .env file found");
            }
        }

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        info!("Config: loaded {}", path.display());
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("PEXO_PROGRESS_INTERVAL_MS") {
            let millis: u64 = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "PEXO_PROGRESS_INTERVAL_MS must be an integer, got {:?}",
                    value
                ))
            })?;
            config.progress_interval = Duration::from_millis(millis);
        }

        if let Some(user_agent) = lookup("PEXO_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "Progress interval must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "User agent cannot be empty".to_string(),
            ));
        }
        if self.progress_interval > Duration::from_secs(1) {
            warn!(
                "Config: progress interval {:?} is coarse, position updates will lag",
                self.progress_interval
            );
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

use std::collections::HashMap;
use std::time::Duration;

use serde_derive::Deserialize;

use crate::errors::ConfigError;

/// Default settings file, resolved as `Settings.toml` (or any other format `config` knows).
pub const DEFAULT_SETTINGS_FILE: &str = "Settings";
/// Environment variables starting with `LIVECOUNT__` override the settings file,
/// e.g. `LIVECOUNT__KAFKA__TOPIC=events`.
pub const ENV_PREFIX: &str = "LIVECOUNT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub kafka:  KafkaSettings,
    pub render: RenderSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaSettings {
    pub brokers:            String,
    pub topic:              String,
    pub group_id:           String,
    pub auto_offset_reset:  String,
    pub session_timeout_ms: u64,
    pub poll_timeout_ms:    u64,
}

impl Default for KafkaSettings {
    fn default() -> KafkaSettings {
        KafkaSettings {
            brokers:            "localhost:9092".to_string(),
            topic:              "project_json".to_string(),
            group_id:           "livecount".to_string(),
            auto_offset_reset:  "earliest".to_string(),
            session_timeout_ms: 6000,
            poll_timeout_ms:    100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub refresh_interval_ms: u64,
    pub bar_width:           usize,
    pub color:               bool,
    pub clear_screen:        bool,
}

impl RenderSettings {
    pub fn refresh_interval(&self) -> Duration { Duration::from_millis(self.refresh_interval_ms) }
}

impl Default for RenderSettings {
    fn default() -> RenderSettings {
        RenderSettings { refresh_interval_ms: 1000, bar_width: 50, color: true, clear_screen: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_retries:        u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms:     u64,
    /// log the updated counts after every message (at debug level)
    pub log_counts:         bool,
}

impl Default for IngestSettings {
    fn default() -> IngestSettings {
        IngestSettings { max_retries: 5, initial_backoff_ms: 500, max_backoff_ms: 30_000, log_counts: true }
    }
}

impl Settings {
    /// Load from the settings file at `path` (optional) and the process environment.
    pub fn load(path: &str) -> Result<Settings, ConfigError> { Settings::load_with_env(path, None) }

    /// Same as [`Settings::load`], reading overrides from `env` instead of the process environment.
    pub fn load_with_env(path: &str, env: Option<HashMap<String, String>>) -> Result<Settings, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { key: key, reason: reason.to_string() })
        };

        if self.kafka.topic.is_empty() {
            return invalid("kafka.topic", "must not be empty");
        }
        if self.kafka.brokers.is_empty() {
            return invalid("kafka.brokers", "must not be empty");
        }
        if self.kafka.poll_timeout_ms == 0 {
            return invalid("kafka.poll_timeout_ms", "must be greater than zero");
        }
        if self.render.refresh_interval_ms == 0 {
            return invalid("render.refresh_interval_ms", "must be greater than zero");
        }
        if self.render.bar_width == 0 {
            return invalid("render.bar_width", "must be greater than zero");
        }
        if self.ingest.initial_backoff_ms > self.ingest.max_backoff_ms {
            return invalid("ingest.initial_backoff_ms", "must not exceed ingest.max_backoff_ms");
        }
        Ok(())
    }
}

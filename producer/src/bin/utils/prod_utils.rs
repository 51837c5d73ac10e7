use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_derive::Deserialize;
use serde_json::{json, Map, Value};

/// The producer runs from its own package directory, next to the consumer's settings.
pub const DEFAULT_SETTINGS_FILE: &str = "../Settings";
const SETTINGS_EXTENSIONS: [&str; 5] = ["toml", "json", "yaml", "yml", "ini"];

pub const CATEGORIES: [&str; 6] = ["humor", "tech", "food", "travel", "entertainment", "gaming"];
const AUTHORS: [&str; 5] = ["Alice", "Bob", "Charlie", "Eve", "Mallory"];
const MESSAGES: [&str; 5] = [
    "I love Python!",
    "Rust ownership finally clicked.",
    "Kafka topics are just logs.",
    "Streaming beats batch today.",
    "Who moved my offsets?",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaSettings {
    pub brokers: String,
    pub topic:   String,
}

impl Default for KafkaSettings {
    fn default() -> KafkaSettings {
        KafkaSettings { brokers: "localhost:9092".to_string(), topic: "project_json".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    pub interval_ms:            u64,
    pub missing_category_ratio: f64,
    pub malformed_ratio:        f64,
    /// 0 keeps producing forever
    pub count:                  u64,
}

impl Default for ProducerSettings {
    fn default() -> ProducerSettings {
        ProducerSettings { interval_ms: 250, missing_category_ratio: 0.1, malformed_ratio: 0.0, count: 0 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub kafka:    KafkaSettings,
    pub producer: ProducerSettings,
}

impl Settings {
    pub fn load(path: &str) -> Result<Settings, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LIVECOUNT").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

/// The file `config` will read for `path`: the path itself, or the path with a known extension.
pub fn resolve_settings_file(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    SETTINGS_EXTENSIONS.iter().map(|ext| path.with_extension(ext)).find(|candidate| candidate.is_file())
}

/// Produces random messages, a share of them without a category or not even json.
pub struct MessageGenerator<R> {
    rng:                    R,
    missing_category_ratio: f64,
    malformed_ratio:        f64,
}

impl<R: Rng> MessageGenerator<R> {
    pub fn new(rng: R, settings: &ProducerSettings) -> MessageGenerator<R> {
        MessageGenerator {
            rng:                    rng,
            missing_category_ratio: settings.missing_category_ratio.max(0.0).min(1.0),
            malformed_ratio:        settings.malformed_ratio.max(0.0).min(1.0),
        }
    }

    pub fn next_payload(&mut self, now: DateTime<Utc>) -> String {
        if self.rng.gen_bool(self.malformed_ratio) {
            return format!("not json {}", now.timestamp());
        }

        let mut fields = Map::new();
        fields.insert("message".to_string(), json!(pick(&mut self.rng, &MESSAGES)));
        fields.insert("author".to_string(), json!(pick(&mut self.rng, &AUTHORS)));
        fields.insert("timestamp".to_string(), json!(now.to_rfc3339()));
        if !self.rng.gen_bool(self.missing_category_ratio) {
            fields.insert("category".to_string(), json!(pick(&mut self.rng, &CATEGORIES)));
        }
        Value::Object(fields).to_string()
    }
}

fn pick<R: Rng>(rng: &mut R, choices: &[&'static str]) -> &'static str {
    choices.choose(rng).copied().unwrap_or("")
}

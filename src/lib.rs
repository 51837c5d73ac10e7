//! Live category tally over a Kafka topic of JSON messages, drawn as a
//! periodically refreshed bar chart.

pub mod chart;
pub mod errors;
pub mod event;
pub mod kafka;
pub mod pipeline;
pub mod settings;
pub mod store;

pub use chart::{ChartFrame, ChartSurface, TerminalChart};
pub use errors::{Error, IngestError, SourceError};
pub use event::{extract_category, FALLBACK_LABEL};
pub use kafka::{Delivery, KafkaSource, MessageSource, ReplaySource};
pub use settings::Settings;
pub use store::{AggregateStore, Snapshot};

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::Message;

use tracing::info;

use crate::errors::{SourceError, SourceErrorKind};
use crate::kafka::source::{Delivery, MessageSource};
use crate::settings::KafkaSettings;

/// Blocking pull over a single Kafka topic.
pub struct KafkaSource {
    consumer:     BaseConsumer,
    topic:        String,
    brokers:      String,
    poll_timeout: Duration,
}

impl KafkaSource {
    pub fn connect(settings: &KafkaSettings) -> Result<KafkaSource, KafkaError> {
        // Create Kafka consumer configuration.
        // Offsets are never committed, counts are not persisted across restarts anyway.
        let consumer: BaseConsumer = ClientConfig::new()
            .set("group.id", &settings.group_id)
            .set("bootstrap.servers", &settings.brokers)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", &settings.auto_offset_reset)
            .set("session.timeout.ms", &settings.session_timeout_ms.to_string())
            .create()?;

        consumer.subscribe(&[settings.topic.as_str()])?;

        info!(topic = %settings.topic, brokers = %settings.brokers, "subscribed, waiting for messages");

        Ok(KafkaSource {
            consumer:     consumer,
            topic:        settings.topic.clone(),
            brokers:      settings.brokers.clone(),
            poll_timeout: Duration::from_millis(settings.poll_timeout_ms),
        })
    }
}

impl MessageSource for KafkaSource {
    fn next_payload(&mut self) -> Result<Delivery, SourceError> {
        match self.consumer.poll(self.poll_timeout) {
            // nothing arrived within the poll timeout, the connection itself is fine
            None => Ok(Delivery::Idle),
            // tombstones carry no payload and decode as malformed
            Some(Ok(message)) => Ok(Delivery::Payload(message.payload().map(<[u8]>::to_vec).unwrap_or_default())),
            Some(Err(err)) => {
                let reason = err.to_string();
                Err(match classify(&err) {
                    SourceErrorKind::Fatal => SourceError::fatal(reason),
                    SourceErrorKind::Transient => SourceError::transient(reason),
                })
            }
        }
    }

    fn describe(&self) -> String { format!("kafka topic \"{}\" at {}", self.topic, self.brokers) }
}

/// Errors the client cannot recover from by itself; everything else is worth another poll.
pub fn classify(err: &KafkaError) -> SourceErrorKind {
    match err {
        KafkaError::ClientConfig(..) | KafkaError::ClientCreation(_) | KafkaError::Subscription(_) => {
            return SourceErrorKind::Fatal;
        }
        _ => {}
    }

    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal)
        | Some(RDKafkaErrorCode::Authentication)
        | Some(RDKafkaErrorCode::SaslAuthenticationFailed)
        | Some(RDKafkaErrorCode::TopicAuthorizationFailed)
        | Some(RDKafkaErrorCode::GroupAuthorizationFailed)
        | Some(RDKafkaErrorCode::InvalidArgument) => SourceErrorKind::Fatal,
        _ => SourceErrorKind::Transient,
    }
}

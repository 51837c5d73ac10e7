use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::errors::{DecodeError, IngestError};
use crate::event;
use crate::kafka::source::{Delivery, MessageSource};
use crate::settings::IngestSettings;
use crate::store::AggregateStore;

/// Exponential backoff between consecutive transient source failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub initial:     Duration,
    pub max:         Duration,
    pub max_retries: u32,
}

impl Backoff {
    pub fn from_settings(settings: &IngestSettings) -> Backoff {
        Backoff {
            initial:     Duration::from_millis(settings.initial_backoff_ms),
            max:         Duration::from_millis(settings.max_backoff_ms),
            max_retries: settings.max_retries,
        }
    }

    /// Pause before retry number `attempt` (1-based): initial * 2^(attempt-1), capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial.checked_mul(factor).unwrap_or(self.max).min(self.max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// payloads pulled from the source
    pub received: u64,
    /// payloads that made it into the store
    pub counted:  u64,
    /// malformed payloads dropped
    pub skipped:  u64,
    /// transient source errors retried
    pub retries:  u64,
}

/// The ingestion loop: pulls payloads one at a time and counts their categories.
///
/// The loop stays running until the source ends (`Ok`) or fails for good (`Err`).
/// A malformed payload is logged and skipped, it never stops the loop.
pub struct Ingestor<S> {
    source:     S,
    store:      AggregateStore,
    backoff:    Backoff,
    log_counts: bool,
    stats:      IngestStats,
}

impl<S: MessageSource> Ingestor<S> {
    pub fn new(source: S, store: AggregateStore, settings: &IngestSettings) -> Ingestor<S> {
        Ingestor {
            source:     source,
            store:      store,
            backoff:    Backoff::from_settings(settings),
            log_counts: settings.log_counts,
            stats:      IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats { &self.stats }

    /// Decode one payload and count it. Returns the label it was counted under.
    pub fn ingest(&mut self, payload: &[u8]) -> Result<String, DecodeError> {
        self.stats.received += 1;

        let message = match event::deserialize(payload) {
            Ok(message) => message,
            Err(err) => {
                self.stats.skipped += 1;
                warn!(bytes = payload.len(), error = %err, "skipping malformed message");
                return Err(err);
            }
        };

        let label = message.category();
        let count = self.store.increment(label);
        self.stats.counted += 1;

        if self.log_counts {
            debug!(category = %label, count = count, "updated message counts: {:?}", self.store.snapshot());
        }
        Ok(label.to_string())
    }

    pub fn run(mut self) -> Result<IngestStats, IngestError> {
        info!(source = %self.source.describe(), "ingestion started");

        // consecutive transient failures, reset by every successful poll
        let mut failures = 0u32;

        loop {
            match self.source.next_payload() {
                Ok(Delivery::Payload(payload)) => {
                    failures = 0;
                    let _ = self.ingest(&payload);
                }
                Ok(Delivery::Idle) => failures = 0,
                Ok(Delivery::End) => {
                    info!(
                        received = self.stats.received,
                        skipped = self.stats.skipped,
                        "message source exhausted, ingestion finished"
                    );
                    return Ok(self.stats);
                }
                Err(err) => {
                    failures += 1;
                    if err.is_fatal() || failures > self.backoff.max_retries {
                        error!(attempts = failures, error = %err, "ingestion failed");
                        return Err(IngestError::Source { attempts: failures, source: err });
                    }

                    let delay = self.backoff.delay(failures);
                    warn!(attempt = failures, delay_ms = delay.as_millis() as u64, error = %err, "retrying message source");
                    self.stats.retries += 1;
                    thread::sleep(delay);
                }
            }
        }
    }
}

//! Ingestion and rendering, run side by side.
//!
//! The ingestion loop owns a dedicated thread and is the only writer of the store.
//! The render timer runs on the calling thread and only ever takes snapshots.
//! The two never talk to each other, except for the ingestion thread reporting how it ended.

pub mod ingest;
pub mod render;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::chart::ChartSurface;
use crate::errors::{Error, IngestError};
use crate::kafka::source::MessageSource;
use crate::settings::IngestSettings;
use crate::store::AggregateStore;

use self::ingest::{IngestStats, Ingestor};
use self::render::{next_deadline, RenderStats, RenderTimer};

/// How a pipeline run ended, when ingestion ended cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub ingest: IngestStats,
    pub render: RenderStats,
}

/// Run ingestion from `source` and redraw `surface` every `period` until ingestion stops.
///
/// Returns once the source is exhausted or has failed. Either way one last frame is drawn
/// first, so the chart never silently freezes on stale counts.
pub fn run<S, C>(
    source: S,
    store: AggregateStore,
    settings: &IngestSettings,
    surface: C,
    period: Duration,
) -> Result<Summary, Error>
where
    S: MessageSource + Send + 'static,
    C: ChartSurface,
{
    let (outcome_tx, outcome_rx) = mpsc::channel::<Result<IngestStats, IngestError>>();

    let ingestor = Ingestor::new(source, store.clone(), settings);
    let handle = thread::Builder::new().name("ingest".to_string()).spawn(move || {
        // nobody listening any more means the supervisor is gone too
        let _ = outcome_tx.send(ingestor.run());
    })?;

    let mut timer = RenderTimer::new(store, surface, period);
    timer.tick();
    let mut deadline = Instant::now() + period;

    let outcome = loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match outcome_rx.recv_timeout(wait) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => {
                timer.tick();
                let (next, dropped) = next_deadline(deadline, period, Instant::now());
                timer.record_dropped(dropped);
                deadline = next;
            }
            // the sender went away without a word: the thread panicked
            Err(RecvTimeoutError::Disconnected) => break Err(IngestError::Vanished),
        }
    };

    if handle.join().is_err() {
        error!("ingestion thread panicked");
    }

    timer.tick();
    let render = timer.stats().clone();

    match outcome {
        Ok(ingest) => {
            info!(
                received = ingest.received,
                counted = ingest.counted,
                skipped = ingest.skipped,
                frames = render.frames,
                "pipeline finished"
            );
            Ok(Summary { ingest: ingest, render: render })
        }
        Err(err) => {
            error!(error = %err, frames = render.frames, "pipeline stopped");
            Err(err.into())
        }
    }
}

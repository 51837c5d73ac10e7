use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use livecount::chart::{ChartFrame, ChartSurface};
use livecount::errors::{Error, IngestError, RenderError, SourceError};
use livecount::kafka::{Delivery, MessageSource, ReplaySource};
use livecount::pipeline;
use livecount::settings::IngestSettings;
use livecount::{AggregateStore, TerminalChart};

/// Keeps every frame it is asked to draw.
#[derive(Clone, Default)]
struct Recorder {
    frames: Arc<Mutex<Vec<ChartFrame>>>,
}

impl Recorder {
    fn frames(&self) -> Vec<ChartFrame> { self.frames.lock().unwrap().clone() }
}

impl ChartSurface for Recorder {
    fn draw(&mut self, frame: &ChartFrame) -> Result<(), RenderError> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

/// Delivers the given payloads, then fails for good.
struct FailsAfter {
    payloads: Vec<&'static str>,
}

impl MessageSource for FailsAfter {
    fn next_payload(&mut self) -> Result<Delivery, SourceError> {
        if self.payloads.is_empty() {
            Err(SourceError::fatal("connection lost"))
        } else {
            Ok(Delivery::Payload(self.payloads.remove(0).as_bytes().to_vec()))
        }
    }

    fn describe(&self) -> String { "failing".to_string() }
}

struct Panics;

impl MessageSource for Panics {
    fn next_payload(&mut self) -> Result<Delivery, SourceError> { panic!("source blew up") }

    fn describe(&self) -> String { "panicking".to_string() }
}

fn settings() -> IngestSettings {
    IngestSettings { max_retries: 0, initial_backoff_ms: 1, max_backoff_ms: 1, log_counts: false }
}

fn replay(lines: &'static str) -> ReplaySource<Cursor<&'static str>> { ReplaySource::new("test", Cursor::new(lines)) }

fn counts(frame: &ChartFrame) -> Vec<(String, u64)> {
    frame.bars.iter().map(|bar| (bar.label.clone(), bar.count)).collect()
}

fn pairs(expected: &[(&str, u64)]) -> Vec<(String, u64)> {
    expected.iter().map(|&(label, count)| (label.to_string(), count)).collect()
}

#[test]
fn tallies_categories_end_to_end() {
    let store = AggregateStore::new();
    let recorder = Recorder::default();

    let summary = pipeline::run(
        replay("{\"category\":\"cats\"}\n{\"category\":\"dogs\"}\n{\"category\":\"cats\"}\n{}\n"),
        store.clone(),
        &settings(),
        recorder.clone(),
        Duration::from_millis(5),
    )
    .unwrap();

    let expected = pairs(&[("cats", 2), ("dogs", 1), ("other", 1)]);
    assert_eq!(store.snapshot().into_entries(), expected);
    assert_eq!(summary.ingest.counted, 4);

    // the last frame is drawn after ingestion ended and shows the final counts
    let frames = recorder.frames();
    assert!(frames.len() >= 2);
    assert_eq!(counts(frames.last().unwrap()), expected);
}

#[test]
fn malformed_messages_are_skipped() {
    let store = AggregateStore::new();

    let summary = pipeline::run(
        replay("{\"category\":\"cats\"}\nthis is not json\n{\"category\":\"cats\"}\n[1,2]\n{\"category\":\"dogs\"}\n"),
        store.clone(),
        &settings(),
        Recorder::default(),
        Duration::from_millis(5),
    )
    .unwrap();

    assert_eq!(store.snapshot().into_entries(), pairs(&[("cats", 2), ("dogs", 1)]));
    assert_eq!(summary.ingest.skipped, 2);
    assert_eq!(summary.ingest.received, 5);
}

#[test]
fn fatal_source_errors_reach_the_caller() {
    let store = AggregateStore::new();
    let recorder = Recorder::default();

    let result = pipeline::run(
        FailsAfter { payloads: vec!["{\"category\":\"cats\"}", "{\"category\":\"cats\"}"] },
        store.clone(),
        &settings(),
        recorder.clone(),
        Duration::from_millis(5),
    );

    match result {
        Err(Error::Ingest(IngestError::Source { source, .. })) => assert!(source.is_fatal()),
        other => panic!("expected ingestion failure, got {:?}", other.map(|_| ())),
    }
    // counts made before the failure are still drawn
    assert_eq!(counts(recorder.frames().last().unwrap()), pairs(&[("cats", 2)]));
}

#[test]
fn ingestion_panic_is_not_silent() {
    let result = pipeline::run(Panics, AggregateStore::new(), &settings(), Recorder::default(), Duration::from_millis(5));

    assert!(matches!(result, Err(Error::Ingest(IngestError::Vanished))));
}

#[test]
fn terminal_chart_renders_final_tally() {
    let store = AggregateStore::new();
    let out = Arc::new(Mutex::new(Vec::<u8>::new()));

    struct Shared(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    let chart = TerminalChart::new(Shared(out.clone()), 10).with_color(false).with_clear_screen(false);
    pipeline::run(
        replay("{\"category\":\"cats\"}\n{\"category\":\"cats\"}\n{\"category\":\"dogs\"}\n"),
        store,
        &settings(),
        chart,
        Duration::from_millis(5),
    )
    .unwrap();

    let text = String::from_utf8(out.lock().unwrap().clone()).unwrap();
    assert!(text.contains("Real-Time Messages vs Category"));
    assert!(text.contains("cats       |██████████ 2\n"), "{}", text);
    assert!(text.contains("dogs       |█████ 1\n"), "{}", text);
}

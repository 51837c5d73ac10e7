use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use livecount::kafka::{KafkaSource, MessageSource, ReplaySource};
use livecount::settings::{Settings, DEFAULT_SETTINGS_FILE};
use livecount::{pipeline, AggregateStore, TerminalChart};

/// Count JSON messages on a Kafka topic by their `category` field and chart the tally live.
#[derive(Debug, Parser)]
#[command(name = "livecount", version)]
struct Args {
    /// settings file (any format the `config` crate understands)
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: String,

    /// kafka bootstrap servers
    #[arg(long)]
    brokers: Option<String>,

    /// topic to consume
    #[arg(long)]
    topic: Option<String>,

    /// consumer group id
    #[arg(long)]
    group_id: Option<String>,

    /// chart refresh interval in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// draw the chart without colors
    #[arg(long)]
    no_color: bool,

    /// replay newline-delimited messages from a file instead of consuming kafka
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(brokers) = &self.brokers {
            settings.kafka.brokers = brokers.clone();
        }
        if let Some(topic) = &self.topic {
            settings.kafka.topic = topic.clone();
        }
        if let Some(group_id) = &self.group_id {
            settings.kafka.group_id = group_id.clone();
        }
        if let Some(refresh_ms) = self.refresh_ms {
            settings.render.refresh_interval_ms = refresh_ms;
        }
        if self.no_color {
            settings.render.color = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // a missing .env file is fine
    dotenv::dotenv().ok();

    // logs go to stderr, stdout belongs to the chart
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config).context("loading settings")?;
    args.apply(&mut settings);
    settings.validate().context("validating settings")?;

    let source: Box<dyn MessageSource + Send> = match &args.replay {
        Some(path) => Box::new(
            ReplaySource::open(path).with_context(|| format!("opening replay file {}", path.display()))?,
        ),
        None => Box::new(KafkaSource::connect(&settings.kafka).context("connecting to kafka")?),
    };

    let surface = TerminalChart::new(io::stdout(), settings.render.bar_width)
        .with_color(settings.render.color)
        .with_clear_screen(settings.render.clear_screen);

    let summary = pipeline::run(
        source,
        AggregateStore::new(),
        &settings.ingest,
        surface,
        settings.render.refresh_interval(),
    )?;

    info!(
        counted = summary.ingest.counted,
        skipped = summary.ingest.skipped,
        dropped_frames = summary.render.dropped,
        "done"
    );
    Ok(())
}

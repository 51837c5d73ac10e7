mod utils;
use utils::prod_utils::{resolve_settings_file, MessageGenerator, Settings, DEFAULT_SETTINGS_FILE};

use rdkafka::config::ClientConfig;
use rdkafka::producer::{BaseRecord, DefaultProducerContext, Producer, ThreadedProducer};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::{thread, time};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    let settings_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SETTINGS_FILE);
    let settings = Settings::load(settings_path).context("loading settings")?;
    match resolve_settings_file(settings_path) {
        Some(file) => info!(file = %file.display(), "loaded settings"),
        None => warn!(path = settings_path, "no settings file found, using built-in defaults"),
    }

    let prod: ThreadedProducer<DefaultProducerContext> = ClientConfig::new()
        .set("bootstrap.servers", &settings.kafka.brokers)
        .set("message.timeout.ms", "5000")
        .create()
        .context("producer creation error")?;

    info!(topic = %settings.kafka.topic, brokers = %settings.kafka.brokers, "producing messages");

    let mut generator = MessageGenerator::new(rand::thread_rng(), &settings.producer);
    let delay = time::Duration::from_millis(settings.producer.interval_ms);

    let mut sent = 0u64;
    while settings.producer.count == 0 || sent < settings.producer.count {
        let payload = generator.next_payload(Utc::now());

        if let Err((err, _)) = prod.send(BaseRecord::to(&settings.kafka.topic).payload(&payload).key("key")) {
            warn!(error = %err, "failed to enqueue message");
        } else {
            info!(payload = %payload, "sent");
            sent += 1;
        }

        thread::sleep(delay);
    }

    prod.flush(time::Duration::from_secs(10)).context("flushing producer")?;
    info!(sent = sent, "done");
    Ok(())
}

// src/main.rs
//! classifieds-watcher daemon entrypoint.
//! Loads the query list, wires source + notifier channels and hands control
//! to the supervisor. Never returns under normal operation.

use std::sync::Arc;

use anyhow::Context;
use classifieds_watcher::config::{config_path, load_config_default};
use classifieds_watcher::source::KleinanzeigenSource;
use classifieds_watcher::supervisor::poller_factory;
use classifieds_watcher::{init_tracing, ListingSource, NotifierMux, Supervisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Bad configuration is fatal: exit non-zero before entering the loop.
    let settings = load_config_default()
        .with_context(|| format!("loading configuration ({})", config_path().display()))?;

    let source: Arc<dyn ListingSource> = Arc::new(
        KleinanzeigenSource::new(&settings.config.http).context("building listing source")?,
    );
    let notifier = Arc::new(NotifierMux::from_env(settings.config.poll.notify_timeout()));

    tracing::info!(
        queries = settings.queries.len(),
        channels = ?notifier.channel_names(),
        "configuration loaded"
    );

    let supervisor = Supervisor::new(
        poller_factory(&settings, source, notifier),
        settings.config.poll.restart_delay(),
    );
    match supervisor.run().await {}
}

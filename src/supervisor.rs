// src/supervisor.rs
//! Crash-only restart policy around [`Poller::run`].
//!
//! Each incarnation gets a freshly built poller. On restart the seen set,
//! the failure window and the heartbeat state start empty; the query list,
//! the source (and its HTTP client) and the notifier channels are reused.
//! Expect a burst of repeat notifications right after a restart.

use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::config::Settings;
use crate::dedup::{BoundedSeenStore, InMemorySeenStore, SeenStore};
use crate::failure_monitor::FailureWindow;
use crate::notify::NotifierMux;
use crate::poller::{Poller, PollerCfg};
use crate::source::{ListingSource, Query};

/// How an incarnation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Panicked(String),
    Cancelled,
}

pub struct Supervisor<F> {
    factory: F,
    restart_delay: Duration,
    incarnations: u64,
}

impl<F> Supervisor<F>
where
    F: Fn() -> Poller,
{
    pub fn new(factory: F, restart_delay: Duration) -> Self {
        Self {
            factory,
            restart_delay,
            incarnations: 0,
        }
    }

    pub fn incarnations(&self) -> u64 {
        self.incarnations
    }

    /// Run incarnations back to back, forever.
    pub async fn run(mut self) -> Infallible {
        loop {
            self.run_incarnation().await;
            if !self.restart_delay.is_zero() {
                tokio::time::sleep(self.restart_delay).await;
            }
        }
    }

    /// Build a fresh poller, run it on its own task and report how it died.
    pub async fn run_incarnation(&mut self) -> Exit {
        self.incarnations += 1;
        let incarnation = self.incarnations;
        tracing::info!(incarnation, "classifieds-watcher starts");

        let poller = (self.factory)();
        let exit = match tokio::spawn(poller.run()).await {
            Ok(never) => match never {},
            Err(e) if e.is_panic() => Exit::Panicked(panic_message(e.into_panic())),
            Err(_) => Exit::Cancelled,
        };

        counter!("watcher_restarts_total").increment(1);
        tracing::error!(
            incarnation,
            exit = ?exit,
            "poller died; restarting with empty state"
        );
        exit
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Factory producing a fresh poller from validated settings.
pub fn poller_factory(
    settings: &Settings,
    source: Arc<dyn ListingSource>,
    notifier: Arc<NotifierMux>,
) -> impl Fn() -> Poller + Send + 'static {
    let queries: Arc<[Query]> = settings.queries.clone().into();
    let cfg = PollerCfg::from(&settings.config.poll);
    let capacity = settings.config.dedup.capacity;
    let window = settings.failure_window;
    let threshold = settings.config.failures.threshold;

    move || {
        let store: Box<dyn SeenStore> = match capacity {
            Some(cap) => Box::new(BoundedSeenStore::with_capacity(cap)),
            None => Box::new(InMemorySeenStore::new()),
        };
        Poller::new(
            Arc::clone(&queries),
            Arc::clone(&source),
            Arc::clone(&notifier),
            cfg,
        )
        .with_seen_store(store)
        .with_failure_window(FailureWindow::new(window, threshold))
    }
}

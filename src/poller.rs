// src/poller.rs
//! Round-robin polling over the configured queries.
//!
//! Containment boundaries:
//! - a failed fetch is recorded in the failure window and the round moves on;
//! - any other source error is logged and the round moves on;
//! - a failed notification is swallowed by the notifier;
//! - anything that escapes `run` (a panic) is handled by the supervisor.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use metrics::counter;

use crate::clock::{Clock, SystemClock};
use crate::config::PollCfg;
use crate::dedup::{Deduplicator, SeenStore};
use crate::error::{ExtractionError, Result, WatchError};
use crate::failure_monitor::{FailureMonitor, FailureWindow};
use crate::heartbeat::HeartbeatState;
use crate::notify::{Notification, NotificationKind, NotifierMux};
use crate::source::{CandidateRecord, Extracted, FetchedPage, ListingSource, Query};

#[derive(Debug, Clone, Copy)]
pub struct PollerCfg {
    pub query_delay: Duration,
    pub round_delay: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PollerCfg {
    fn default() -> Self {
        Self::from(&PollCfg::default())
    }
}

impl From<&PollCfg> for PollerCfg {
    fn from(c: &PollCfg) -> Self {
        Self {
            query_delay: c.query_delay(),
            round_delay: c.round_delay(),
            fetch_timeout: c.fetch_timeout(),
        }
    }
}

/// What happened during one pass over all queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// A heartbeat line was logged at the start of this round.
    pub heartbeat: bool,
    pub queries: usize,
    pub fetch_failures: usize,
    /// Source errors that are not fetch failures; they skip the window.
    pub source_errors: usize,
    pub new_listings: usize,
    pub degraded: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub escalations: usize,
}

pub struct Poller {
    queries: Arc<[Query]>,
    source: Arc<dyn ListingSource>,
    notifier: Arc<NotifierMux>,
    clock: Arc<dyn Clock>,
    dedup: Deduplicator,
    failures: FailureMonitor,
    heartbeat: HeartbeatState,
    cfg: PollerCfg,
}

impl Poller {
    /// Fresh poller: empty seen set, empty failure window, no heartbeat yet.
    pub fn new(
        queries: Arc<[Query]>,
        source: Arc<dyn ListingSource>,
        notifier: Arc<NotifierMux>,
        cfg: PollerCfg,
    ) -> Self {
        crate::metrics::ensure_metrics_described();
        let failures = FailureMonitor::new(FailureWindow::default(), Arc::clone(&notifier));
        Self {
            queries,
            source,
            notifier,
            clock: Arc::new(SystemClock),
            dedup: Deduplicator::default(),
            failures,
            heartbeat: HeartbeatState::new(),
            cfg,
        }
    }

    pub fn with_seen_store(mut self, store: Box<dyn SeenStore>) -> Self {
        self.dedup = Deduplicator::new(store);
        self
    }

    pub fn with_failure_window(mut self, window: FailureWindow) -> Self {
        self.failures = FailureMonitor::new(window, Arc::clone(&self.notifier));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn failure_window(&self) -> &FailureWindow {
        self.failures.window()
    }

    pub fn heartbeat(&self) -> &HeartbeatState {
        &self.heartbeat
    }

    /// Poll forever. Only a panic ends this future.
    pub async fn run(mut self) -> Infallible {
        tracing::info!(
            queries = self.queries.len(),
            source = self.source.name(),
            "poller started"
        );
        loop {
            let report = self.run_round().await;
            tracing::debug!(?report, "round finished");
            pause(self.cfg.round_delay).await;
        }
    }

    /// One pass over all queries in configured order.
    pub async fn run_round(&mut self) -> RoundReport {
        let mut report = RoundReport {
            heartbeat: self.heartbeat.tick(self.clock.now().hour()),
            ..RoundReport::default()
        };
        let queries = Arc::clone(&self.queries);
        for query in queries.iter() {
            report.queries += 1;
            match self.fetch(query).await {
                Ok(page) => self.process_page(query, page, &mut report).await,
                Err(e) if e.is_fetch_failure() => {
                    tracing::error!(error = %e, url = %query.url, "fetch failed");
                    report.fetch_failures += 1;
                    let now = self.clock.now().with_timezone(&Utc);
                    if self.failures.record(now).await {
                        report.escalations += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, url = %query.url, "source error");
                    report.source_errors += 1;
                }
            }
            pause(self.cfg.query_delay).await;
        }

        counter!("watcher_rounds_total").increment(1);
        report
    }

    /// Fetch bounded by the timeout; non-success statuses become errors.
    async fn fetch(&self, query: &Query) -> Result<FetchedPage> {
        let page = tokio::time::timeout(self.cfg.fetch_timeout, self.source.fetch(query))
            .await
            .map_err(|_| {
                WatchError::network(
                    &query.url,
                    format!("timed out after {:?}", self.cfg.fetch_timeout),
                )
            })??;

        if !page.status.is_success() {
            return Err(WatchError::http(&query.url, page.status));
        }
        Ok(page)
    }

    async fn process_page(&mut self, query: &Query, page: FetchedPage, report: &mut RoundReport) {
        tracing::debug!(url = %query.url, items = page.items.len(), "page fetched");

        for item in page.items {
            // Excluded items are never marked seen.
            if query.excludes(&item) {
                report.excluded += 1;
                counter!("watcher_excluded_total").increment(1);
                tracing::debug!(identity = item.identity(), "excluded by pattern");
                continue;
            }
            if !self.dedup.mark_new(item.identity()) {
                report.duplicates += 1;
                counter!("watcher_duplicates_total").increment(1);
                continue;
            }

            let n = match &item {
                Extracted::Candidate(c) => {
                    report.new_listings += 1;
                    tracing::info!(identity = %c.identity, price = ?c.display_price, "new listing");
                    Notification::new(NotificationKind::NewListing, new_listing_message(c))
                }
                Extracted::Broken(b) => {
                    report.degraded += 1;
                    tracing::warn!(identity = %b.identity, field = b.field, "listing could not be parsed");
                    Notification::new(NotificationKind::Degraded, degraded_message(b))
                }
            };
            self.notifier.notify(&n).await;
        }
    }
}

pub fn new_listing_message(c: &CandidateRecord) -> String {
    let price = c.display_price.as_deref().unwrap_or("no price given");
    if c.display_description.is_empty() {
        format!("Check out {}\nit's {price}", c.link)
    } else {
        format!("Check out {}\n{}\nit's {price}", c.link, c.display_description)
    }
}

pub fn degraded_message(b: &ExtractionError) -> String {
    format!("Exception: found no {} tag on: {}", b.field, b.link)
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

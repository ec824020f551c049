// src/metrics.rs
//! Counter and gauge descriptions. No exporter is served; embedders may
//! install any `metrics` recorder before starting the supervisor.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry descriptions).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watcher_rounds_total", "Completed passes over all queries.");
        describe_counter!(
            "watcher_fetch_failures_total",
            "Fetches that failed with a network error, timeout or non-success status."
        );
        describe_counter!(
            "watcher_escalations_total",
            "Escalations sent because fetch failures clustered."
        );
        describe_counter!(
            "watcher_notifications_total",
            "Notifications handed to the notifier, by kind."
        );
        describe_counter!(
            "watcher_notify_failures_total",
            "Notification deliveries dropped, by channel."
        );
        describe_counter!(
            "watcher_excluded_total",
            "Listings dropped by a query exclusion pattern."
        );
        describe_counter!(
            "watcher_duplicates_total",
            "Listings dropped because they were already reported."
        );
        describe_counter!("watcher_restarts_total", "Poller incarnations that died.");
        describe_gauge!(
            "watcher_seen_identities",
            "Identities currently held by the seen store."
        );
        describe_histogram!("watcher_parse_ms", "Search page parse time in milliseconds.");
    });
}

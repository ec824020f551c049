// src/failure_monitor.rs
//! # Failure window
//! Sliding time window over fetch failures (default 30 min).
//!
//! Escalates once the window holds more than `threshold` failures, then
//! clears itself. The next escalation needs a fresh cluster.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use metrics::counter;

use crate::notify::{Notification, NotificationKind, NotifierMux};

pub const DEFAULT_WINDOW_SECS: i64 = 30 * 60;
pub const DEFAULT_THRESHOLD: usize = 2;

/// Failure timestamps within the trailing window.
#[derive(Debug, Clone)]
pub struct FailureWindow {
    buf: VecDeque<DateTime<Utc>>,
    window: Duration,
    threshold: usize,
}

impl Default for FailureWindow {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS), DEFAULT_THRESHOLD)
    }
}

impl FailureWindow {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            buf: VecDeque::new(),
            window,
            threshold,
        }
    }

    /// Record a failure at `now`. Returns the failure count when it exceeds
    /// the threshold; the window is cleared in that case.
    pub fn record(&mut self, now: DateTime<Utc>) -> Option<usize> {
        self.buf.push_back(now);
        self.prune(now);

        let n = self.buf.len();
        if n > self.threshold {
            self.buf.clear();
            Some(n)
        } else {
            None
        }
    }

    /// Drop entries older than `now - window`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        // Window reaching before the earliest representable instant: keep all.
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return;
        };
        // not pop_front: entries may be out of order after a clock step
        self.buf.retain(|t| *t >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Failure window wired to the notifier.
pub struct FailureMonitor {
    window: FailureWindow,
    notifier: Arc<NotifierMux>,
}

impl FailureMonitor {
    pub fn new(window: FailureWindow, notifier: Arc<NotifierMux>) -> Self {
        Self { window, notifier }
    }

    /// Record a fetch failure; returns true when an escalation was sent.
    pub async fn record(&mut self, now: DateTime<Utc>) -> bool {
        counter!("watcher_fetch_failures_total").increment(1);

        let Some(n) = self.window.record(now) else {
            return false;
        };

        let msg = escalation_message(n, self.window.window());
        tracing::error!(failures = n, "{msg}");
        counter!("watcher_escalations_total").increment(1);
        self.notifier
            .notify(&Notification::new(NotificationKind::Escalation, msg))
            .await;
        true
    }

    pub fn window(&self) -> &FailureWindow {
        &self.window
    }
}

pub fn escalation_message(n: usize, window: Duration) -> String {
    format!(
        "classifieds-watcher received {n} fetch errors within the last {} minutes",
        window.num_minutes()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn two_failures_do_not_escalate() {
        let mut w = FailureWindow::default();
        assert_eq!(w.record(t0()), None);
        assert_eq!(w.record(t0() + Duration::minutes(5)), None);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn third_failure_in_window_escalates_and_clears() {
        let mut w = FailureWindow::default();
        w.record(t0());
        w.record(t0() + Duration::minutes(5));
        assert_eq!(w.record(t0() + Duration::minutes(10)), Some(3));
        assert!(w.is_empty());
    }

    #[test]
    fn old_failures_fall_out_of_window() {
        let mut w = FailureWindow::default();
        w.record(t0());
        w.record(t0() + Duration::minutes(1));
        // both older than 30 minutes by now
        assert_eq!(w.record(t0() + Duration::minutes(45)), None);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn boundary_entry_exactly_window_old_is_kept() {
        let mut w = FailureWindow::default();
        w.record(t0());
        w.prune(t0() + Duration::minutes(30));
        assert_eq!(w.len(), 1);
        w.prune(t0() + Duration::minutes(30) + Duration::seconds(1));
        assert!(w.is_empty());
    }

    #[test]
    fn window_reaching_past_min_time_keeps_everything() {
        let mut w = FailureWindow::new(Duration::MAX, 5);
        w.record(t0());
        w.prune(t0() + Duration::days(365));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn message_mentions_count_and_minutes() {
        assert_eq!(
            escalation_message(3, Duration::minutes(30)),
            "classifieds-watcher received 3 fetch errors within the last 30 minutes"
        );
    }
}

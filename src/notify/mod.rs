// src/notify/mod.rs
//! Outbound notifications.
//!
//! `NotifierMux` owns no policy: it fans a message out to every configured
//! channel and swallows failures. Delivery problems are logged and counted,
//! never escalated, because escalations travel the same path.

pub mod discord;
pub mod pushover;
pub mod slack;

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::error::WatchError;

pub use discord::DiscordNotifier;
pub use pushover::PushoverNotifier;
pub use slack::SlackNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationKind {
    NewListing,
    Degraded,
    Escalation,
    Test,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewListing => "new_listing",
            NotificationKind::Degraded => "degraded",
            NotificationKind::Escalation => "escalation",
            NotificationKind::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub ts: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ts: Utc::now(),
        }
    }

    /// Short title used by channels that support one.
    pub fn title(&self) -> &'static str {
        match self.kind {
            NotificationKind::NewListing => "New listing",
            NotificationKind::Degraded => "Listing could not be parsed",
            NotificationKind::Escalation => "Fetch errors piling up",
            NotificationKind::Test => "Test notification",
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, n: &Notification) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fan-out over all configured channels.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
    timeout: Duration,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    /// Channels whose credentials are present in the environment.
    pub fn from_env(timeout: Duration) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(p) = PushoverNotifier::from_env() {
            channels.push(Box::new(p));
        }
        if let Ok(url) = std::env::var("DISCORD_WEBHOOK_URL") {
            channels.push(Box::new(DiscordNotifier::new(url)));
        }
        if let Ok(url) = std::env::var("SLACK_WEBHOOK_URL") {
            channels.push(Box::new(SlackNotifier::new(url)));
        }
        tracing::info!(
            channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "notifier channels configured"
        );
        Self::new(channels, timeout)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Best-effort delivery. Returns true if at least one channel accepted.
    pub async fn notify(&self, n: &Notification) -> bool {
        counter!("watcher_notifications_total", "kind" => n.kind.as_str()).increment(1);

        if self.channels.is_empty() {
            tracing::info!(kind = n.kind.as_str(), "notification (no channels): {}", n.message);
            return false;
        }

        let mut delivered = false;
        for ch in &self.channels {
            let res = match tokio::time::timeout(self.timeout, ch.send(n)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(WatchError::notify(ch.name(), format!("{e:#}"))),
                Err(_) => Err(WatchError::notify(
                    ch.name(),
                    format!("timed out after {:?}", self.timeout),
                )),
            };
            match res {
                Ok(()) => delivered = true,
                Err(e) => {
                    counter!("watcher_notify_failures_total", "channel" => ch.name()).increment(1);
                    tracing::error!(error = %e, kind = n.kind.as_str(), "notification dropped");
                }
            }
        }
        delivered
    }
}

/// POST with bounded retries and exponential backoff (500ms, 1s, 2s, ...).
pub(crate) async fn send_with_retries<F>(max_retries: u8, mut attempt_fn: F) -> Result<()>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let max = max_retries.max(1);
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        let err = match attempt_fn().send().await {
            Ok(rsp) => match rsp.error_for_status() {
                Ok(_) => return Ok(()),
                Err(e) => anyhow::anyhow!("HTTP error: {e}"),
            },
            Err(e) => anyhow::anyhow!("request failed: {e}"),
        };
        if attempt >= max {
            return Err(err);
        }
        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
    }
}

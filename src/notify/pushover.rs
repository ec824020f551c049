// src/notify/pushover.rs
use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use super::{send_with_retries, Notification, NotificationKind, Notifier};

pub const PUSHOVER_API: &str = "https://api.pushover.net/1/messages.json";

#[derive(Clone)]
pub struct PushoverNotifier {
    endpoint: String,
    token: String,
    user: String,
    client: Client,
    max_retries: u8,
}

#[derive(Serialize)]
struct PushoverForm<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
    priority: i8,
}

impl PushoverNotifier {
    pub fn new(token: String, user: String) -> Self {
        Self {
            endpoint: PUSHOVER_API.to_string(),
            token,
            user,
            client: Client::new(),
            max_retries: 3,
        }
    }

    /// `None` unless both PUSHOVER_TOKEN and PUSHOVER_USER are set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("PUSHOVER_TOKEN").ok()?;
        let user = std::env::var("PUSHOVER_USER").ok()?;
        Some(Self::new(token, user))
    }

    /// Override the API endpoint (tests, self-hosted relays).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    fn priority(kind: NotificationKind) -> i8 {
        match kind {
            NotificationKind::Escalation => 1,
            _ => 0,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let form = PushoverForm {
            token: &self.token,
            user: &self.user,
            title: n.title(),
            message: &n.message,
            priority: Self::priority(n.kind),
        };
        send_with_retries(self.max_retries, || {
            self.client.post(&self.endpoint).form(&form)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "pushover"
    }
}

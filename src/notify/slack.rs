// src/notify/slack.rs
use anyhow::Result;
use reqwest::Client;

use super::{send_with_retries, Notification, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    max_retries: u8,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            max_retries: 3,
        }
    }

    pub fn with_retries(mut self, n: u8) -> Self {
        self.max_retries = n;
        self
    }
}

fn slack_text(n: &Notification) -> String {
    format!("*{}*\n{}\n@ {}", n.title(), n.message, n.ts.to_rfc3339())
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let body = serde_json::json!({ "text": slack_text(n) });
        send_with_retries(self.max_retries, || {
            self.client.post(&self.webhook_url).json(&body)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}

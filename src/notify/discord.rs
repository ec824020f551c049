// src/notify/discord.rs
use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use super::{send_with_retries, Notification, Notifier};

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            max_retries: 3,
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let description = format!("{}\n**Time (UTC):** {}", n.message, n.ts.to_rfc3339());
        let payload = DiscordWebhookPayload::embed(n.title(), &description);

        send_with_retries(self.max_retries, || {
            self.client.post(&self.webhook).json(&payload)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                description: description.to_string(),
            }],
        }
    }
}

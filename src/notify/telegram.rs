use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::core::config::NotifyConfig;
use crate::core::{Result, SyncError};
use crate::scanner::ListingSummary;

/// Telegram Bot API sender: a venue pin, then the description with a link.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct SendVenue<'a> {
    chat_id: i64,
    latitude: f64,
    longitude: f64,
    title: &'a str,
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, config: &NotifyConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_ids: config.chat_ids.clone(),
        }
    }

    async fn call<T: Serialize + ?Sized>(&self, method: &str, body: &T) -> Result<()> {
        let url = format!("{}/bot{}/{}", self.api_base, self.bot_token, method);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::notification(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        let parsed: Option<TelegramResponse> = response.json().await.ok();

        match parsed {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(TelegramResponse { description, .. }) => Err(SyncError::notification(format!(
                "{} returned {}: {}",
                method,
                status,
                description.unwrap_or_default()
            ))),
            None => Err(SyncError::notification(format!(
                "{} returned {} with an unreadable body",
                method, status
            ))),
        }
    }
}

fn listing_message(summary: &ListingSummary) -> String {
    format!(
        "{} [hier]({})",
        summary.description.as_deref().unwrap_or("Nieuwe woning"),
        summary.url
    )
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, summary: &ListingSummary) -> Result<()> {
        let text = listing_message(summary);
        let title = summary.price.as_deref().unwrap_or("Prijs onbekend");
        let address = summary.address.as_deref().unwrap_or_default();

        for &chat_id in &self.chat_ids {
            if let Some(location) = summary.location {
                self.call(
                    "sendVenue",
                    &SendVenue {
                        chat_id,
                        latitude: location.lat,
                        longitude: location.lng,
                        title,
                        address,
                    },
                )
                .await?;
            }

            self.call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text: &text,
                    parse_mode: "Markdown",
                },
            )
            .await?;
        }

        Ok(())
    }
}

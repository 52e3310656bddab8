use async_trait::async_trait;
use serde_json::json;

use crate::models::OwnerId;

/// Outbound message delivery. Failures are logged but never block the main
/// flow.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, owner: OwnerId, text: &str);

    /// Best-effort "still working" indicator. No-op by default.
    async fn send_typing(&self, _owner: OwnerId) {}
}

/// Telegram delivery.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
}

impl Notifier {
    pub fn new(http: reqwest::Client, bot_token: String) -> Self {
        Self { http, bot_token }
    }

    async fn post(&self, method: &str, body: serde_json::Value) -> Result<(), String> {
        let url = format!("https://api.telegram.org/bot{}/{method}", self.bot_token);
        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("{method} returned {}", resp.status())),
            Err(e) => Err(format!("{method} failed: {e}")),
        }
    }
}

#[async_trait]
impl MessageSink for Notifier {
    async fn send(&self, owner: OwnerId, text: &str) {
        let body = json!({
            "chat_id": owner,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Err(e) = self.post("sendMessage", body).await {
            tracing::warn!(owner, error = %e, "Failed to deliver message");
        }
    }

    async fn send_typing(&self, owner: OwnerId) {
        let body = json!({ "chat_id": owner, "action": "typing" });
        if let Err(e) = self.post("sendChatAction", body).await {
            tracing::debug!(owner, error = %e, "Typing indicator failed (harmless)");
        }
    }
}

/// Fallback sink for running without delivery credentials: messages go to
/// the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    async fn send(&self, owner: OwnerId, text: &str) {
        tracing::info!(owner, %text, "Message (no delivery sink configured)");
    }
}

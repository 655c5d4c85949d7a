// # Telegram Notifier
//
// Delivers one-line alerts through the Telegram Bot API:
//
// ```http
// POST https://api.telegram.org/bot<token>/sendMessage
// {"chat_id": "<chat>", "text": "<message>"}
// ```
//
// The bot token is part of the URL, so request URLs are never logged.

use async_trait::async_trait;
use ddns_core::config::TelegramConfig;
use ddns_core::traits::Notifier;
use ddns_core::{Error, Result};
use serde::Serialize;

/// Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Notifier posting to a single Telegram chat
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier from its configuration
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token or chat id is empty.
    pub fn new(config: &TelegramConfig, client: reqwest::Client) -> Result<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            return Err(Error::config("Telegram token and chat id are required"));
        }

        Ok(Self {
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
            base_url: TELEGRAM_API_BASE.to_string(),
            client,
        })
    }

    /// Point the notifier at another API base
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text: message,
        };

        // reqwest errors embed the URL; drop it so the token stays out of logs.
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::network(format!("Telegram request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::notifier(format!(
                "Telegram sendMessage failed: {status} - {error_text}"
            )));
        }

        tracing::debug!("Telegram notification delivered to chat {}", self.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config() -> TelegramConfig {
        TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: "-100200".to_string(),
        }
    }

    fn notifier(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new(&config(), reqwest::Client::new())
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn sends_chat_id_and_text() {
        let server = MockServer::start_async().await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:abc/sendMessage")
                    .json_body(json!({ "chat_id": "-100200", "text": "198.51.100.4" }));
                then.status(200).json_body(json!({ "ok": true, "result": {} }));
            })
            .await;

        notifier(&server).notify("198.51.100.4").await.unwrap();

        send.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn rejected_message_is_a_notifier_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400)
                    .json_body(json!({ "ok": false, "description": "Bad Request: chat not found" }));
            })
            .await;

        let err = notifier(&server).notify("hello").await.unwrap_err();

        match err {
            Error::Notifier(message) => assert!(message.contains("chat not found"), "{message}"),
            other => panic!("expected notifier error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_hides_token() {
        let notifier = TelegramNotifier::new(&config(), reqwest::Client::new())
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let err = notifier.notify("hello").await.unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert!(!err.to_string().contains("123:abc"), "{err}");
    }

    #[test]
    fn empty_chat_id_is_rejected() {
        let config = TelegramConfig {
            token: "t".to_string(),
            chat_id: String::new(),
        };
        assert!(TelegramNotifier::new(&config, reqwest::Client::new()).is_err());
    }

    #[test]
    fn token_not_exposed_in_debug() {
        let notifier = TelegramNotifier::new(&config(), reqwest::Client::new()).unwrap();
        assert!(!format!("{notifier:?}").contains("123:abc"));
    }
}

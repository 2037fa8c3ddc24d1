//! Minimal Telegram Bot API client.
//!
//! Only covers what the relay needs: posting a Markdown message with an
//! optional inline keyboard to a single chat.
//!
//! ```rust,ignore
//! use telegram::{TelegramOptions, TelegramService};
//!
//! let telegram = TelegramService::new(TelegramOptions::new("123:abc", "-10042"))?;
//! let sent = telegram.send_message("*hello*", None).await?;
//! ```

use std::time::Duration;

pub mod error;
pub mod models;

pub use error::{Result, TelegramError};
pub use models::{InlineKeyboardButton, InlineKeyboardMarkup, SentMessage};

use reqwest::Client;

use crate::models::{ApiResponse, SendMessageRequest};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    pub chat_id: String,
    /// Overridable for tests and self-hosted Bot API servers.
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramOptions {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TelegramService {
    options: TelegramOptions,
    client: Client,
}

impl TelegramService {
    pub fn new(options: TelegramOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self { options, client })
    }

    pub fn chat_id(&self) -> &str {
        &self.options.chat_id
    }

    /// Send a Markdown message to the configured chat.
    pub async fn send_message(
        &self,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<SentMessage> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.options.api_base.trim_end_matches('/'),
            self.options.bot_token
        );

        let body = SendMessageRequest {
            chat_id: &self.options.chat_id,
            text,
            parse_mode: Some("Markdown"),
            reply_markup,
        };

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed = serde_json::from_str::<ApiResponse<SentMessage>>(&text);
        match parsed {
            Ok(ApiResponse {
                ok: true,
                result: Some(message),
                ..
            }) if status.is_success() => {
                tracing::debug!(message_id = message.message_id, "Telegram message sent");
                Ok(message)
            }
            Ok(api) => Err(TelegramError::Api {
                status: status.as_u16(),
                description: api
                    .description
                    .unwrap_or_else(|| "response was not ok".to_string()),
            }),
            Err(_) => Err(TelegramError::Api {
                status: status.as_u16(),
                description: text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn spawn_fake_api(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let app = Router::new().route(
            "/bottest-token/sendMessage",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                let reply = reply.clone();
                async move {
                    captured.lock().unwrap().push(body);
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), seen)
    }

    fn service(base: &str) -> TelegramService {
        TelegramService::new(TelegramOptions::new("test-token", "-1001").with_api_base(base))
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_message_posts_markdown_with_keyboard() {
        let (base, seen) = spawn_fake_api(
            StatusCode::OK,
            json!({"ok": true, "result": {"message_id": 77}}),
        )
        .await;

        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::url(
                "Copy",
                "tg://msg?text=1234",
            )]],
        };
        let sent = service(&base)
            .send_message("*hi*", Some(keyboard))
            .await
            .unwrap();
        assert_eq!(sent.message_id, 77);

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["chat_id"], "-1001");
        assert_eq!(bodies[0]["parse_mode"], "Markdown");
        assert_eq!(
            bodies[0]["reply_markup"]["inline_keyboard"][0][0]["url"],
            "tg://msg?text=1234"
        );
    }

    #[tokio::test]
    async fn test_not_ok_response_is_api_error() {
        let (base, _) = spawn_fake_api(
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error_code": 400, "description": "chat not found"}),
        )
        .await;

        let err = service(&base).send_message("hi", None).await.unwrap_err();
        match err {
            TelegramError::Api {
                status,
                description,
            } => {
                assert_eq!(status, 400);
                assert_eq!(description, "chat not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        let err = service("http://127.0.0.1:1")
            .send_message("hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TelegramError::Http(_)));
    }

    #[tokio::test]
    async fn test_configured_timeout_bounds_the_request() {
        let app = Router::new().route(
            "/bottest-token/sendMessage",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"ok": true, "result": {"message_id": 1}}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let service = TelegramService::new(
            TelegramOptions::new("test-token", "-1001")
                .with_api_base(format!("http://{}", addr))
                .with_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = service.send_message("hi", None).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            TelegramError::Http(e) => assert!(e.is_timeout(), "expected timeout, got {e}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelegramError>;

#[derive(Debug, Error)]
pub enum TelegramError {
    /// Request never produced a response (connect error, timeout, ...)
    #[error("request to Telegram failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Bot API answered with `ok: false` or a non-success status
    #[error("Telegram API error ({status}): {description}")]
    Api { status: u16, description: String },
}

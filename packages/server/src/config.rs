use std::env;
use std::time::Duration;

use chrono::FixedOffset;
use dotenvy::dotenv;
use url::Url;

use crate::common::{RelayError, RelayResult};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub portal_email: String,
    pub portal_password: String,
    pub portal_base_url: Url,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub port: u16,
    pub database_url: String,
    /// How often the session self-check runs
    pub self_check_interval: Duration,
    /// How often the feed page is re-read for changes
    pub feed_poll_interval: Duration,
    /// Upper bound for every portal, storage and Telegram call
    pub call_timeout: Duration,
    /// Pause before the coordinator retries a failed login
    pub login_retry_delay: Duration,
    /// Offset used to render notification timestamps
    pub display_offset: FixedOffset,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> RelayResult<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> RelayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> RelayResult<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(RelayError::ConfigMissing { name })
        };
        let optional = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let portal_base_url = optional("PORTAL_BASE_URL")
            .unwrap_or_else(|| "https://www.ivasms.com".to_string());
        let portal_base_url =
            Url::parse(&portal_base_url).map_err(|e| RelayError::ConfigInvalid {
                name: "PORTAL_BASE_URL",
                reason: e.to_string(),
            })?;

        let display_offset = match optional("DISPLAY_UTC_OFFSET") {
            Some(raw) => parse_offset(&raw).ok_or_else(|| RelayError::ConfigInvalid {
                name: "DISPLAY_UTC_OFFSET",
                reason: format!("expected +HH:MM, got {raw}"),
            })?,
            None => FixedOffset::east_opt(5 * 3600 + 30 * 60).ok_or(RelayError::ConfigInvalid {
                name: "DISPLAY_UTC_OFFSET",
                reason: "default offset out of range".to_string(),
            })?,
        };

        Ok(Self {
            portal_email: required("IVASMS_EMAIL")?,
            portal_password: required("IVASMS_PASSWORD")?,
            portal_base_url,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            port: parse_number("PORT", optional("PORT"), 3000)?,
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://db.sqlite".to_string()),
            self_check_interval: Duration::from_secs(parse_positive(
                "SELF_CHECK_INTERVAL_SECS",
                optional("SELF_CHECK_INTERVAL_SECS"),
                60,
            )?),
            feed_poll_interval: Duration::from_millis(parse_positive(
                "FEED_POLL_INTERVAL_MS",
                optional("FEED_POLL_INTERVAL_MS"),
                2000,
            )?),
            call_timeout: Duration::from_secs(parse_positive(
                "CALL_TIMEOUT_SECS",
                optional("CALL_TIMEOUT_SECS"),
                30,
            )?),
            login_retry_delay: Duration::from_secs(parse_positive(
                "LOGIN_RETRY_SECS",
                optional("LOGIN_RETRY_SECS"),
                30,
            )?),
            display_offset,
        })
    }
}

fn parse_number<T>(name: &'static str, raw: Option<String>, default: T) -> RelayResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| RelayError::ConfigInvalid {
                name,
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

/// Durations: zero would mean a busy poll loop or a timeout that always fires.
fn parse_positive(name: &'static str, raw: Option<String>, default: u64) -> RelayResult<u64> {
    let value = parse_number(name, raw, default)?;
    if value == 0 {
        return Err(RelayError::ConfigInvalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Parse `+HH:MM` / `-HH:MM` into a fixed offset.
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

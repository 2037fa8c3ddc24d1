// Common types used across multiple domains and layers
//
// These types are shared between the kernel and domain layers to avoid
// circular dependencies while maintaining type safety.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell texts of one row of the feed table, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}

/// One feed row translated to structure, not yet deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub service_label: String,
    pub destination: String,
    pub code: Option<String>,
    pub raw_message: String,
}

impl CandidateRecord {
    /// A record without a destination or without a code is never forwarded.
    pub fn is_actionable(&self) -> bool {
        !self.destination.is_empty() && self.code.is_some()
    }

    /// Identity used for deduplication, `None` for non-actionable records.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        if !self.is_actionable() {
            return None;
        }
        let code = self.code.clone()?;
        Some(DedupKey::new(code, self.destination.clone()))
    }

    /// Row signature the watcher compares between observations.
    ///
    /// A missing code is spelled `null` so that two code-less rows for the
    /// same destination still compare equal.
    pub fn signature(&self) -> String {
        format!(
            "{}_{}",
            self.code.as_deref().unwrap_or("null"),
            self.destination
        )
    }
}

/// `(code, destination)`: the only thing that decides whether a record was seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub code: String,
    pub destination: String,
}

impl DedupKey {
    pub fn new(code: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.code, self.destination)
    }
}

/// Authentication state of the portal session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unknown,
    Unauthenticated,
    Authenticated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unknown => "unknown",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}

/// A committed record on its way to the notification channel.
///
/// `timestamp` is already formatted in the display timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub record: CandidateRecord,
    pub timestamp: String,
}

impl NotificationEvent {
    pub fn new(record: CandidateRecord, timestamp: impl Into<String>) -> Self {
        Self {
            record,
            timestamp: timestamp.into(),
        }
    }
}

//! Turns a raw feed row into a candidate record.
//!
//! Feed columns: service, number, range, rate, message. Only service,
//! number and message are read; the row must still carry all five.

use lazy_static::lazy_static;
use regex::Regex;

use crate::common::{CandidateRecord, RawRow};

/// Minimum number of cells a feed row must have
pub const FEED_COLUMNS: usize = 5;

const SERVICE_COLUMN: usize = 0;
const DESTINATION_COLUMN: usize = 1;
const MESSAGE_COLUMN: usize = 4;

lazy_static! {
    // First standalone run of 4 to 6 digits. ASCII word boundary: letters of
    // other scripts directly before or after the digits still delimit them.
    static ref CODE_REGEX: Regex = Regex::new(r"(?-u:\b)[0-9]{4,6}(?-u:\b)").unwrap();
}

/// Parse a feed row. `None` means the row does not look like a feed entry.
pub fn extract(row: &RawRow) -> Option<CandidateRecord> {
    if row.cells.len() < FEED_COLUMNS {
        return None;
    }

    let raw_message = row.cells[MESSAGE_COLUMN].trim().to_string();

    Some(CandidateRecord {
        service_label: row.cells[SERVICE_COLUMN].trim().to_string(),
        destination: row.cells[DESTINATION_COLUMN].trim().to_string(),
        code: extract_code(&raw_message),
        raw_message,
    })
}

/// First standalone 4-6 digit token of `message`.
pub fn extract_code(message: &str) -> Option<String> {
    CODE_REGEX.find(message).map(|m| m.as_str().to_string())
}

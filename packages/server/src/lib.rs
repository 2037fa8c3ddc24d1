// SMS OTP Relay - Core
//
// Watches the portal's live SMS feed, extracts one-time codes, deduplicates
// them against a durable store and forwards new ones to a Telegram chat.
//
// Domain logic lives in domains/*; external collaborators sit behind the
// traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

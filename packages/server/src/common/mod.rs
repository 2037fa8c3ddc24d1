// Common types and utilities shared across the application

pub mod error;
pub mod types;

pub use error::{RelayError, RelayResult};
pub use types::*;

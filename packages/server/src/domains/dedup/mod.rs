// Dedup domain - persistent record of forwarded codes
pub mod models;
pub mod store;

pub use store::SqliteDedupStore;

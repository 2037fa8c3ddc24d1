// Business domains
pub mod dedup;
pub mod feed;
pub mod notify;
pub mod session;

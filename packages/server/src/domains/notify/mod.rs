// Notify domain - rendering and delivering chat alerts
pub mod dispatcher;
pub mod render;

pub use dispatcher::NotificationDispatcher;
pub use render::{format_timestamp, render, startup_event};

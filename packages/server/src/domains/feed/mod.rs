// Feed domain - reading the live SMS table
pub mod extractor;
pub mod watcher;

pub use extractor::extract;
pub use watcher::{ChangeWatcher, WatchSignal};

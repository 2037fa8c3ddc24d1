// HTTP server setup (Axum liveness surface)
pub mod app;
pub mod routes;

pub use app::*;

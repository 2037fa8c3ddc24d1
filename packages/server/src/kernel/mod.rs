//! Kernel module - relay infrastructure and dependencies.

pub mod deps;
pub mod pipeline;
pub mod portal;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::{RelayDeps, TelegramAdapter};
pub use pipeline::{
    CandidateOutcome, PipelineCoordinator, PipelineSettings, PipelineStats, StatsSnapshot,
};
pub use portal::{PortalAuthenticator, PortalFeedSurface};
pub use scheduled_tasks::{run_session_check, start_scheduler};
pub use test_dependencies::TestDependencies;
pub use traits::*;

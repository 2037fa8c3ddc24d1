//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every SELF_CHECK_INTERVAL_SECS)
//!     │
//!     └─► run_session_check()
//!             └─► SessionController::ensure_authenticated()
//!                     └─► re-login if the browser context fell back to the login form
//! ```
//!
//! The check shares the controller's login guard with the pipeline, so a
//! self-check never races a recovery already in flight.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::common::SessionState;
use crate::domains::session::SessionController;

/// Start all scheduled tasks
pub async fn start_scheduler(
    session: Arc<SessionController>,
    self_check_interval: Duration,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let check_session = session.clone();
    let check_job = Job::new_repeated_async(self_check_interval, move |_uuid, _lock| {
        let session = check_session.clone();
        Box::pin(async move {
            run_session_check(&session).await;
        })
    })?;

    scheduler.add(check_job).await?;
    scheduler.start().await?;

    tracing::info!(interval = ?self_check_interval, "Scheduled tasks started (session self-check)");
    Ok(scheduler)
}

/// Confirm the session is still authenticated, logging in again if not.
///
/// Failures are logged; the next tick tries again.
pub async fn run_session_check(session: &SessionController) -> SessionState {
    tracing::debug!("Running session self-check");

    if let Err(e) = session.ensure_authenticated().await {
        tracing::warn!(error = %e, "Session self-check could not restore the session");
    }
    session.state()
}

//! Test harness that runs the full pipeline against mock collaborators.
//!
//! The coordinator is spawned on the runtime the way the binary does it;
//! tests drive the mock surface and observe the mock notifier and store.

use std::sync::Arc;
use std::time::Duration;

use relay_core::common::RawRow;
use relay_core::domains::feed::ChangeWatcher;
use relay_core::domains::notify::NotificationDispatcher;
use relay_core::domains::session::{Credentials, SessionController};
use relay_core::kernel::{PipelineCoordinator, PipelineSettings, PipelineStats, TestDependencies};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long `eventually` waits before failing a test.
const SETTLE: Duration = Duration::from_secs(3);

pub struct TestHarness {
    pub deps: TestDependencies,
    pub session: Arc<SessionController>,
    pub stats: Arc<PipelineStats>,
    shutdown: CancellationToken,
    pipeline: Option<JoinHandle<()>>,
}

impl TestHarness {
    /// Spawn the pipeline over `deps`.
    pub fn start(deps: TestDependencies) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let relay = deps.deps();
        let shutdown = CancellationToken::new();

        let session = Arc::new(SessionController::new(
            relay.authenticator.clone(),
            Credentials {
                email: "me@example.com".to_string(),
                password: "secret".to_string(),
            },
            "https://portal.test/portal/live/my_sms",
            Duration::from_secs(1),
        ));
        let dispatcher = NotificationDispatcher::new(
            relay.notifier.clone(),
            Duration::from_secs(1),
            shutdown.clone(),
        );
        let coordinator = PipelineCoordinator::new(
            relay.store.clone(),
            dispatcher,
            session.clone(),
            PipelineSettings {
                store_timeout: Duration::from_secs(1),
                login_retry_delay: Duration::from_millis(20),
                ..Default::default()
            },
        );
        let stats = coordinator.stats();
        let watcher = ChangeWatcher::new(relay.surface.clone(), Duration::from_secs(1));

        let token = shutdown.clone();
        let pipeline = tokio::spawn(async move { coordinator.run(watcher, token).await });

        Self {
            deps,
            session,
            stats,
            shutdown,
            pipeline: Some(pipeline),
        }
    }

    /// Cancel the pipeline and wait for it to release the surface.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(pipeline) = self.pipeline.take() {
            tokio::time::timeout(SETTLE, pipeline)
                .await
                .expect("pipeline did not stop")
                .expect("pipeline task panicked");
        }
    }

    /// Chat messages delivered so far, startup included.
    pub fn sent(&self) -> usize {
        self.deps.notifier.sent().len()
    }

    /// Replace the top row and push a mutation.
    pub async fn show_row(&self, row: RawRow) {
        self.deps.surface.set_top_row(Some(row));
        self.deps.surface.mutate().await;
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A five-column feed row.
pub fn feed_row(service: &str, number: &str, message: &str) -> RawRow {
    RawRow::new([service, number, "RANGE", "0.01", message])
}

/// Poll `check` until it holds or the settle time runs out.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + SETTLE;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {}", what);
}

/// Give the pipeline time to act on anything already pushed.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

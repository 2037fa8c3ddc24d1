//! Pipeline coordinator.
//!
//! ```text
//! SessionController ──► ChangeWatcher ──► candidate
//!                                            │
//!                                            ├─► not actionable → discard
//!                                            ├─► exists? ── yes → duplicate
//!                                            │      └─ err → drop candidate
//!                                            └─► commit → notify
//! ```
//!
//! One candidate is in flight at a time. The dedup commit always happens
//! before the notification, and a failed notification never undoes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{CandidateRecord, DedupKey, NotificationEvent, RelayError, RelayResult};
use crate::domains::feed::{ChangeWatcher, WatchSignal};
use crate::domains::notify::{format_timestamp, NotificationDispatcher};
use crate::domains::session::SessionController;
use crate::kernel::BaseDedupStore;

/// What happened to a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Discarded,
    Duplicate,
    StoreFailed,
    Notified,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    candidates: AtomicU64,
    discarded: AtomicU64,
    duplicates: AtomicU64,
    store_failures: AtomicU64,
    notified: AtomicU64,
    session_recoveries: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub candidates: u64,
    pub discarded: u64,
    pub duplicates: u64,
    pub store_failures: u64,
    pub notified: u64,
    pub session_recoveries: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            candidates: self.candidates.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            session_recoveries: self.session_recoveries.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Timing knobs of the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub store_timeout: Duration,
    pub login_retry_delay: Duration,
    pub display_offset: FixedOffset,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(30),
            login_retry_delay: Duration::from_secs(30),
            display_offset: FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or(Utc.fix()),
        }
    }
}

pub struct PipelineCoordinator {
    store: Arc<dyn BaseDedupStore>,
    dispatcher: NotificationDispatcher,
    session: Arc<SessionController>,
    stats: Arc<PipelineStats>,
    settings: PipelineSettings,
}

impl PipelineCoordinator {
    pub fn new(
        store: Arc<dyn BaseDedupStore>,
        dispatcher: NotificationDispatcher,
        session: Arc<SessionController>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            dispatcher,
            session,
            stats: Arc::new(PipelineStats::default()),
            settings,
        }
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Decide whether `record` is new and forward it if so.
    pub async fn process_candidate(&self, record: CandidateRecord) -> CandidateOutcome {
        PipelineStats::bump(&self.stats.candidates);

        let Some(key) = record.dedup_key() else {
            debug!(
                destination = %record.destination,
                has_code = record.code.is_some(),
                "Discarding non-actionable candidate"
            );
            PipelineStats::bump(&self.stats.discarded);
            return CandidateOutcome::Discarded;
        };

        let exists = match self.store_call(self.store.exists(&key)).await {
            Ok(exists) => exists,
            Err(e) => return self.store_failed(&key, e),
        };

        if exists {
            info!(%key, "Duplicate OTP+number, not sending");
            PipelineStats::bump(&self.stats.duplicates);
            return CandidateOutcome::Duplicate;
        }

        if let Err(e) = self.store_call(self.store.commit(&key)).await {
            return self.store_failed(&key, e);
        }

        let event = NotificationEvent::new(record, self.now());
        self.dispatcher.notify(&event).await;
        PipelineStats::bump(&self.stats.notified);
        CandidateOutcome::Notified
    }

    /// Re-establish the session after the watcher saw the login form.
    pub async fn handle_session_invalidated(&self) -> RelayResult<()> {
        PipelineStats::bump(&self.stats.session_recoveries);
        self.session.session_invalidated().await
    }

    /// Drive the watcher until `shutdown` fires.
    pub async fn run(&self, mut watcher: ChangeWatcher, shutdown: CancellationToken) {
        info!("Pipeline started");
        let mut generation = self.session.subscribe_generation();
        let mut startup_sent = false;

        'session: loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.session.ensure_authenticated().await {
                warn!(error = %e, retry_in = ?self.settings.login_retry_delay, "Waiting before next login attempt");
                if self.pause(self.settings.login_retry_delay, &shutdown).await {
                    break;
                }
                continue;
            }
            generation.borrow_and_update();

            if let Err(e) = watcher.attach(&shutdown).await {
                warn!(error = %e, "Could not attach to feed surface");
                if self.pause(self.settings.login_retry_delay, &shutdown).await {
                    break;
                }
                continue;
            }

            if !startup_sent {
                self.dispatcher.notify_startup(&self.now()).await;
                startup_sent = true;
            }

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break 'session,
                    Ok(()) = generation.changed() => {
                        info!("Session re-established; re-attaching watcher");
                        watcher.detach();
                        continue 'session;
                    }
                    signal = watcher.next_signal() => match signal {
                        Some(WatchSignal::Candidate(record)) => {
                            self.process_candidate(record).await;
                        }
                        Some(WatchSignal::SessionInvalidated) => {
                            watcher.detach();
                            if let Err(e) = self.handle_session_invalidated().await {
                                warn!(error = %e, "Session recovery failed");
                                if self.pause(self.settings.login_retry_delay, &shutdown).await {
                                    break 'session;
                                }
                            }
                            continue 'session;
                        }
                        None => {
                            warn!("Feed surface closed; re-attaching");
                            watcher.detach();
                            if self.pause(self.settings.login_retry_delay, &shutdown).await {
                                break 'session;
                            }
                            continue 'session;
                        }
                    }
                }
            }
        }

        watcher.release().await;
        info!(stats = ?self.stats.snapshot(), "Pipeline stopped");
    }

    async fn store_call<T>(
        &self,
        call: impl std::future::Future<Output = RelayResult<T>>,
    ) -> RelayResult<T> {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::StoreUnavailable(format!(
                "no answer within {:?}",
                self.settings.store_timeout
            ))),
        }
    }

    fn store_failed(&self, key: &DedupKey, e: RelayError) -> CandidateOutcome {
        error!(%key, error = %e, "Dedup store failed; dropping candidate");
        PipelineStats::bump(&self.stats.store_failures);
        CandidateOutcome::StoreFailed
    }

    fn now(&self) -> String {
        format_timestamp(Utc::now(), self.settings.display_offset)
    }

    /// Sleep for `delay`; true if shutdown fired first.
    async fn pause(&self, delay: Duration, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

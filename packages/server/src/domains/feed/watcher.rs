//! Change watcher over the live feed table.
//!
//! The feed surface pushes `SurfaceEvent`s into a channel; the watcher is its
//! only consumer. Each mutation re-reads the top row and a candidate is
//! emitted only when the row signature differs from the last one seen, so a
//! redraw that leaves the content unchanged produces nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::extractor;
use crate::common::{CandidateRecord, RelayResult};
use crate::kernel::{BaseFeedSurface, SurfaceEvent};

/// Buffered surface events per attachment
const EVENT_BUFFER: usize = 64;

/// What the watcher hands to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Candidate(CandidateRecord),
    /// The feed was replaced by the login form; no rows are read until re-attached
    SessionInvalidated,
}

pub struct ChangeWatcher {
    surface: Arc<dyn BaseFeedSurface>,
    read_timeout: Duration,
    last_signature: Option<String>,
    events: Option<mpsc::Receiver<SurfaceEvent>>,
    detach: Option<CancellationToken>,
    initial_check_pending: bool,
    suspended: bool,
}

impl ChangeWatcher {
    pub fn new(surface: Arc<dyn BaseFeedSurface>, read_timeout: Duration) -> Self {
        Self {
            surface,
            read_timeout,
            last_signature: None,
            events: None,
            detach: None,
            initial_check_pending: false,
            suspended: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.events.is_some()
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    /// Attach to the feed surface for a freshly authenticated session.
    ///
    /// The next call to [`next_signal`](Self::next_signal) reads the current
    /// top row without waiting for a mutation.
    pub async fn attach(&mut self, shutdown: &CancellationToken) -> RelayResult<()> {
        self.detach();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = shutdown.child_token();
        if let Err(e) = self.surface.attach(tx, token.clone()).await {
            token.cancel();
            return Err(e);
        }

        self.events = Some(rx);
        self.detach = Some(token);
        self.initial_check_pending = true;
        self.suspended = false;
        info!("Watcher attached to feed surface");
        Ok(())
    }

    /// Stop the current attachment. The last signature is kept.
    pub fn detach(&mut self) {
        if let Some(token) = self.detach.take() {
            token.cancel();
            debug!("Watcher detached from feed surface");
        }
        self.events = None;
        self.initial_check_pending = false;
    }

    /// Detach and let the surface free its resources.
    pub async fn release(&mut self) {
        self.detach();
        self.surface.release().await;
    }

    /// Wait for the next signal.
    ///
    /// Returns `None` when not attached or when the surface closed its side
    /// of the channel.
    pub async fn next_signal(&mut self) -> Option<WatchSignal> {
        loop {
            if self.initial_check_pending {
                self.initial_check_pending = false;
                if let Some(record) = self.check_top_row().await {
                    return Some(WatchSignal::Candidate(record));
                }
                continue;
            }

            let event = self.events.as_mut()?.recv().await?;
            match event {
                SurfaceEvent::LoginRedirect => {
                    if self.suspended {
                        continue;
                    }
                    self.suspended = true;
                    warn!("Feed surface redirected to login; suspending row processing");
                    return Some(WatchSignal::SessionInvalidated);
                }
                SurfaceEvent::Mutated if self.suspended => {
                    trace!("Ignoring mutation while session is invalid");
                }
                SurfaceEvent::Mutated => {
                    if let Some(record) = self.check_top_row().await {
                        return Some(WatchSignal::Candidate(record));
                    }
                }
            }
        }
    }

    async fn check_top_row(&mut self) -> Option<CandidateRecord> {
        let row = match tokio::time::timeout(self.read_timeout, self.surface.current_top_row()).await
        {
            Ok(Ok(Some(row))) => row,
            Ok(Ok(None)) => {
                debug!("Feed table has no rows");
                return None;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read top row");
                return None;
            }
            Err(_) => {
                warn!(timeout = ?self.read_timeout, "Timed out reading top row");
                return None;
            }
        };

        let Some(record) = extractor::extract(&row) else {
            debug!(cells = row.cells.len(), "Row rejected by extractor");
            return None;
        };

        self.observe(record)
    }

    fn observe(&mut self, record: CandidateRecord) -> Option<CandidateRecord> {
        let signature = record.signature();
        if self.last_signature.as_deref() == Some(signature.as_str()) {
            trace!(%signature, "Top row unchanged");
            return None;
        }

        debug!(%signature, service = %record.service_label, "Top row changed");
        self.last_signature = Some(signature);
        Some(record)
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.detach();
    }
}

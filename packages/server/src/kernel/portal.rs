//! Portal adapters - the live SMS page as a feed surface and authenticator.
//!
//! There is no DOM observer over plain HTTP, so the surface polls the feed
//! page and turns "top row differs from the previous poll" into a mutation
//! event. Landing on the login path becomes a login-redirect event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_client::{PortalClient, PortalError};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::{RawRow, RelayError, RelayResult};
use crate::kernel::{BaseAuthenticator, BaseFeedSurface, SurfaceEvent};

// =============================================================================
// Authenticator
// =============================================================================

pub struct PortalAuthenticator {
    portal: Arc<PortalClient>,
}

impl PortalAuthenticator {
    pub fn new(portal: Arc<PortalClient>) -> Self {
        Self { portal }
    }
}

#[async_trait]
impl BaseAuthenticator for PortalAuthenticator {
    async fn login(&self, email: &str, password: &str) -> RelayResult<()> {
        self.portal
            .login(email, password)
            .await
            .map_err(|e| RelayError::AuthenticationFailed(e.to_string()))
    }

    async fn navigate_to(&self, url: &str) -> RelayResult<()> {
        let url = Url::parse(url).map_err(|e| RelayError::AuthenticationFailed(e.to_string()))?;
        self.portal
            .navigate_to(&url)
            .await
            .map(|_| ())
            .map_err(|e| RelayError::AuthenticationFailed(e.to_string()))
    }

    async fn on_login_page(&self) -> RelayResult<bool> {
        Ok(self.portal.on_login_page().await)
    }
}

// =============================================================================
// Feed Surface
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Poll {
    Feed { changed: bool },
    LoginRedirect,
}

pub struct PortalFeedSurface {
    portal: Arc<PortalClient>,
    poll_interval: Duration,
    top_row: Arc<RwLock<Option<RawRow>>>,
    stop: CancellationToken,
}

impl PortalFeedSurface {
    pub fn new(portal: Arc<PortalClient>, poll_interval: Duration) -> Self {
        Self {
            portal,
            poll_interval,
            top_row: Arc::new(RwLock::new(None)),
            stop: CancellationToken::new(),
        }
    }

    async fn poll(
        portal: &PortalClient,
        top_row: &RwLock<Option<RawRow>>,
    ) -> Result<Poll, PortalError> {
        let page = portal.navigate_to(&portal.feed_url()).await?;
        if portal.is_login_url(&page.url) {
            return Ok(Poll::LoginRedirect);
        }

        let row = page.top_row().map(RawRow::new);
        let mut current = top_row.write().await;
        let changed = *current != row;
        *current = row;
        Ok(Poll::Feed { changed })
    }
}

#[async_trait]
impl BaseFeedSurface for PortalFeedSurface {
    async fn attach(
        &self,
        events: mpsc::Sender<SurfaceEvent>,
        detach: CancellationToken,
    ) -> RelayResult<()> {
        let first = Self::poll(&self.portal, &self.top_row)
            .await
            .map_err(|e| RelayError::SurfaceUnavailable(e.to_string()))?;

        let initial = match first {
            Poll::LoginRedirect => SurfaceEvent::LoginRedirect,
            Poll::Feed { .. } => SurfaceEvent::Mutated,
        };
        let _ = events.send(initial).await;

        let portal = self.portal.clone();
        let top_row = self.top_row.clone();
        let interval = self.poll_interval;
        let stop = self.stop.clone();

        tokio::spawn(async move {
            info!(interval = ?interval, "Feed poller started");
            loop {
                tokio::select! {
                    _ = detach.cancelled() => break,
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let event = match Self::poll(&portal, &top_row).await {
                    Ok(Poll::Feed { changed: true }) => SurfaceEvent::Mutated,
                    Ok(Poll::Feed { changed: false }) => continue,
                    Ok(Poll::LoginRedirect) => SurfaceEvent::LoginRedirect,
                    Err(e) => {
                        warn!(error = %e, "Feed poll failed");
                        continue;
                    }
                };

                if events.send(event).await.is_err() {
                    break;
                }
            }
            debug!("Feed poller stopped");
        });

        Ok(())
    }

    async fn current_top_row(&self) -> RelayResult<Option<RawRow>> {
        Ok(self.top_row.read().await.clone())
    }

    async fn release(&self) {
        self.stop.cancel();
        *self.top_row.write().await = None;
    }
}

// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Change detection, dedup and session recovery are domain code built on these.
//
// Naming convention: Base* for trait names (e.g., BaseFeedSurface, BaseNotifier)

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{DedupKey, RawRow, RelayResult};

// =============================================================================
// Feed Surface Trait (Infrastructure - live table observation)
// =============================================================================

/// What the feed surface reports to its single consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Table content may have changed; re-read the top row
    Mutated,
    /// The surface now shows the login form instead of the feed
    LoginRedirect,
}

#[async_trait]
pub trait BaseFeedSurface: Send + Sync {
    /// Start pushing events into `events` until `detach` is cancelled.
    ///
    /// Implementations must push at least one `Mutated` right after attaching.
    async fn attach(
        &self,
        events: mpsc::Sender<SurfaceEvent>,
        detach: CancellationToken,
    ) -> RelayResult<()>;

    /// Most recent row of the feed table, `None` if the table is empty.
    async fn current_top_row(&self) -> RelayResult<Option<RawRow>>;

    /// Release whatever the surface holds; called once on shutdown.
    async fn release(&self) {}
}

// =============================================================================
// Authenticator Trait (Infrastructure - portal login)
// =============================================================================

#[async_trait]
pub trait BaseAuthenticator: Send + Sync {
    /// Submit credentials
    async fn login(&self, email: &str, password: &str) -> RelayResult<()>;

    /// Move the authenticated session to `url`
    async fn navigate_to(&self, url: &str) -> RelayResult<()>;

    /// True if the session currently shows the login form
    async fn on_login_page(&self) -> RelayResult<bool>;
}

// =============================================================================
// Dedup Store Trait (Infrastructure - persistent seen-set)
// =============================================================================

#[async_trait]
pub trait BaseDedupStore: Send + Sync {
    /// `Ok(false)` for unseen keys; errors only when storage is unreachable.
    async fn exists(&self, key: &DedupKey) -> RelayResult<bool>;

    /// Idempotent insert. Committing a present key succeeds.
    async fn commit(&self, key: &DedupKey) -> RelayResult<()>;
}

// =============================================================================
// Notifier Trait (Infrastructure - chat transport)
// =============================================================================

/// A button rendered under a chat message that opens `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAction {
    pub label: String,
    pub url: String,
}

/// Rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub actions: Vec<MessageAction>,
}

#[async_trait]
pub trait BaseNotifier: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> RelayResult<()>;
}

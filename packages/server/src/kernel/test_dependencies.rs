// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected into RelayDeps for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    BaseAuthenticator, BaseDedupStore, BaseFeedSurface, BaseNotifier, OutboundMessage,
    RelayDeps, SurfaceEvent,
};
use crate::common::{DedupKey, RawRow, RelayError, RelayResult};

// =============================================================================
// Mock Feed Surface
// =============================================================================

pub struct MockFeedSurface {
    top_row: Mutex<Option<RawRow>>,
    sender: Mutex<Option<mpsc::Sender<SurfaceEvent>>>,
    initial_mutation: bool,
    fail_reads: AtomicBool,
    attach_count: AtomicUsize,
    released: AtomicBool,
}

impl MockFeedSurface {
    pub fn new() -> Self {
        Self {
            top_row: Mutex::new(None),
            sender: Mutex::new(None),
            initial_mutation: true,
            fail_reads: AtomicBool::new(false),
            attach_count: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        }
    }

    pub fn with_top_row(self, row: RawRow) -> Self {
        *self.top_row.lock().unwrap() = Some(row);
        self
    }

    /// Do not push the `Mutated` event a real surface sends on attach
    pub fn without_initial_mutation(mut self) -> Self {
        self.initial_mutation = false;
        self
    }

    pub fn set_top_row(&self, row: Option<RawRow>) {
        *self.top_row.lock().unwrap() = row;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Push a table mutation to the attached watcher
    pub async fn mutate(&self) {
        self.push(SurfaceEvent::Mutated).await;
    }

    /// Simulate the page being replaced by the login form
    pub async fn redirect_to_login(&self) {
        self.push(SurfaceEvent::LoginRedirect).await;
    }

    /// Drop the event channel, as if the surface died
    pub fn close(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn push(&self, event: SurfaceEvent) {
        let sender = self.sender.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }
}

impl Default for MockFeedSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseFeedSurface for MockFeedSurface {
    async fn attach(
        &self,
        events: mpsc::Sender<SurfaceEvent>,
        _detach: CancellationToken,
    ) -> RelayResult<()> {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        if self.initial_mutation {
            let _ = events.try_send(SurfaceEvent::Mutated);
        }
        *self.sender.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn current_top_row(&self) -> RelayResult<Option<RawRow>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RelayError::SurfaceUnavailable(
                "mock read failure".to_string(),
            ));
        }
        Ok(self.top_row.lock().unwrap().clone())
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.close();
    }
}

// =============================================================================
// Mock Authenticator
// =============================================================================

pub struct MockAuthenticator {
    reject_logins: AtomicBool,
    on_login_page: AtomicBool,
    login_delay: Mutex<Duration>,
    login_calls: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self {
            reject_logins: AtomicBool::new(false),
            on_login_page: AtomicBool::new(false),
            login_delay: Mutex::new(Duration::ZERO),
            login_calls: AtomicUsize::new(0),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// Each login takes `delay` before answering
    pub fn with_login_delay(self, delay: Duration) -> Self {
        *self.login_delay.lock().unwrap() = delay;
        self
    }

    pub fn reject_logins(&self, reject: bool) {
        self.reject_logins.store(reject, Ordering::SeqCst);
    }

    /// Make the session look expired until the next successful login
    pub fn expire_session(&self) {
        self.on_login_page.store(true, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

impl Default for MockAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthenticator for MockAuthenticator {
    async fn login(&self, _email: &str, _password: &str) -> RelayResult<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.login_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.reject_logins.load(Ordering::SeqCst) {
            self.on_login_page.store(true, Ordering::SeqCst);
            return Err(RelayError::AuthenticationFailed(
                "mock credentials rejected".to_string(),
            ));
        }
        self.on_login_page.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn navigate_to(&self, url: &str) -> RelayResult<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn on_login_page(&self) -> RelayResult<bool> {
        Ok(self.on_login_page.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Mock Dedup Store
// =============================================================================

pub struct MockDedupStore {
    keys: Mutex<HashSet<DedupKey>>,
    unavailable_codes: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    exists_calls: AtomicUsize,
    commit_calls: AtomicUsize,
}

impl MockDedupStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
            unavailable_codes: Mutex::new(HashSet::new()),
            delay: Mutex::new(Duration::ZERO),
            exists_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_key(self, key: DedupKey) -> Self {
        self.keys.lock().unwrap().insert(key);
        self
    }

    /// Each store call takes `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Every store call touching `code` fails with `StoreUnavailable`
    pub fn unavailable_for(&self, code: &str) {
        self.unavailable_codes
            .lock()
            .unwrap()
            .insert(code.to_string());
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_available(&self, key: &DedupKey) -> RelayResult<()> {
        if self.unavailable_codes.lock().unwrap().contains(&key.code) {
            return Err(RelayError::StoreUnavailable(
                "mock storage offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockDedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDedupStore for MockDedupStore {
    async fn exists(&self, key: &DedupKey) -> RelayResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.check_available(key)?;
        Ok(self.contains(key))
    }

    async fn commit(&self, key: &DedupKey) -> RelayResult<()> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.check_available(key)?;
        self.keys.lock().unwrap().insert(key.clone());
        Ok(())
    }
}

// =============================================================================
// Mock Notifier
// =============================================================================

pub struct MockNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: AtomicBool,
    delay: Mutex<Duration>,
    attempts: AtomicUsize,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Each send takes `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Messages that were delivered
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivered messages whose text mentions `needle`
    pub fn sent_containing(&self, needle: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.text.contains(needle))
            .collect()
    }

    /// Send attempts, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseNotifier for MockNotifier {
    async fn send(&self, message: &OutboundMessage) -> RelayResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::TransportFailure(
                "mock transport down".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock collaborators plus the `RelayDeps` built from them.
pub struct TestDependencies {
    pub surface: Arc<MockFeedSurface>,
    pub authenticator: Arc<MockAuthenticator>,
    pub store: Arc<MockDedupStore>,
    pub notifier: Arc<MockNotifier>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            surface: Arc::new(MockFeedSurface::new()),
            authenticator: Arc::new(MockAuthenticator::new()),
            store: Arc::new(MockDedupStore::new()),
            notifier: Arc::new(MockNotifier::new()),
        }
    }

    pub fn with_surface(mut self, surface: MockFeedSurface) -> Self {
        self.surface = Arc::new(surface);
        self
    }

    pub fn with_authenticator(mut self, authenticator: MockAuthenticator) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    pub fn with_store(mut self, store: MockDedupStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_notifier(mut self, notifier: MockNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn deps(&self) -> RelayDeps {
        RelayDeps {
            surface: self.surface.clone(),
            authenticator: self.authenticator.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

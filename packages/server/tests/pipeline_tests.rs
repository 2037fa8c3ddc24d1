//! End-to-end pipeline behavior against mock collaborators.

mod common;

use std::time::Duration;

use common::*;
use relay_core::common::{DedupKey, SessionState};
use relay_core::kernel::test_dependencies::{MockAuthenticator, MockDedupStore, MockFeedSurface};
use relay_core::kernel::{run_session_check, TestDependencies};

#[tokio::test]
async fn test_new_code_is_forwarded_once() {
    let deps = TestDependencies::new().with_surface(
        MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Your code is 482913")),
    );
    let mut h = TestHarness::start(deps);

    eventually("startup and OTP messages", || h.sent() == 2).await;

    let sent = h.deps.notifier.sent();
    assert!(sent[0].text.contains("monitoring"));
    assert!(sent[0].actions.is_empty());
    assert!(sent[1].text.contains("OTP Code: *482913*"));
    assert!(sent[1].text.contains("+1555"));
    assert_eq!(sent[1].actions.len(), 2);

    assert!(h.deps.store.contains(&DedupKey::new("482913", "+1555")));
    assert_eq!(h.deps.store.len(), 1, "startup message must not be committed");

    // Same row again: unchanged signature, nothing new.
    h.deps.surface.mutate().await;
    settle().await;
    assert_eq!(h.sent(), 2);

    h.stop().await;
    assert!(h.deps.surface.released());
}

#[tokio::test]
async fn test_previously_seen_code_is_not_forwarded() {
    let deps = TestDependencies::new()
        .with_surface(
            MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Your code is 482913")),
        )
        .with_store(MockDedupStore::new().with_key(DedupKey::new("482913", "+1555")));
    let mut h = TestHarness::start(deps);

    eventually("duplicate counted", || h.stats.snapshot().duplicates == 1).await;
    assert_eq!(h.sent(), 1);
    assert!(h.deps.notifier.sent_containing("482913").is_empty());

    h.stop().await;
}

#[tokio::test]
async fn test_row_churn_is_deduplicated_by_code_and_number() {
    let mut h = TestHarness::start(TestDependencies::new());
    eventually("startup message", || h.sent() == 1).await;

    h.show_row(feed_row("X", "+1555", "code 1111")).await;
    eventually("first code", || h.sent() == 2).await;

    h.show_row(feed_row("Y", "+1555", "code 2222")).await;
    eventually("second code", || h.sent() == 3).await;

    // 1111 comes back on top with different wording.
    h.show_row(feed_row("Z", "+1555", "again: 1111")).await;
    eventually("duplicate counted", || h.stats.snapshot().duplicates == 1).await;

    // Same code for a different number is a different key.
    h.show_row(feed_row("X", "+1666", "code 1111")).await;
    eventually("other number", || h.sent() == 4).await;

    assert_eq!(h.deps.notifier.sent_containing("1111").len(), 2);
    assert_eq!(h.deps.store.len(), 3);

    h.stop().await;
}

#[tokio::test]
async fn test_non_actionable_rows_never_reach_store_or_chat() {
    let deps = TestDependencies::new().with_surface(
        MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Welcome to the service")),
    );
    let mut h = TestHarness::start(deps);

    eventually("row discarded", || h.stats.snapshot().discarded == 1).await;
    h.show_row(feed_row("X", "", "code 4321")).await;
    eventually("row discarded", || h.stats.snapshot().discarded == 2).await;

    assert_eq!(h.deps.store.exists_calls(), 0);
    assert!(h.deps.store.is_empty());
    assert_eq!(h.sent(), 1);

    h.stop().await;
}

#[tokio::test]
async fn test_store_outage_drops_only_affected_candidate() {
    let deps = TestDependencies::new().with_surface(
        MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Your code is 1111")),
    );
    deps.store.unavailable_for("1111");
    let mut h = TestHarness::start(deps);

    eventually("store failure counted", || h.stats.snapshot().store_failures == 1).await;
    assert!(h.deps.notifier.sent_containing("1111").is_empty());

    h.show_row(feed_row("X", "+1555", "Your code is 2222")).await;
    eventually("next code forwarded", || {
        h.deps.notifier.sent_containing("2222").len() == 1
    })
    .await;

    h.stop().await;
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_pipeline() {
    let deps = TestDependencies::new();
    deps.notifier.fail_sends(true);
    let mut h = TestHarness::start(deps);

    eventually("startup attempted", || h.deps.notifier.attempts() == 1).await;
    h.show_row(feed_row("X", "+1555", "code 1111")).await;
    eventually("OTP attempted", || h.deps.notifier.attempts() == 2).await;
    assert!(h.deps.store.contains(&DedupKey::new("1111", "+1555")));

    h.deps.notifier.fail_sends(false);
    h.show_row(feed_row("X", "+1555", "code 2222")).await;
    eventually("next code delivered", || h.sent() == 1).await;

    h.stop().await;
}

#[tokio::test]
async fn test_session_expiry_recovers_and_reattaches() {
    let deps = TestDependencies::new().with_surface(
        MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Your code is 482913")),
    );
    let mut h = TestHarness::start(deps);
    eventually("startup and OTP messages", || h.sent() == 2).await;

    h.deps.authenticator.expire_session();
    h.deps.surface.redirect_to_login().await;

    eventually("re-login and re-attach", || {
        h.deps.authenticator.login_calls() == 2 && h.deps.surface.attach_count() == 2
    })
    .await;
    assert_eq!(h.session.state(), SessionState::Authenticated);
    assert_eq!(h.stats.snapshot().session_recoveries, 1);

    // The row still on top after recovery is not forwarded again.
    settle().await;
    assert_eq!(h.sent(), 2);

    h.show_row(feed_row("X", "+1555", "Your code is 777888")).await;
    eventually("code after recovery", || h.sent() == 3).await;

    h.stop().await;
}

#[tokio::test]
async fn test_self_check_relogin_reattaches_watcher() {
    let mut h = TestHarness::start(TestDependencies::new());
    eventually("startup message", || h.sent() == 1).await;

    h.deps.authenticator.expire_session();
    assert_eq!(run_session_check(&h.session).await, SessionState::Authenticated);

    eventually("watcher re-attached", || h.deps.surface.attach_count() == 2).await;

    h.show_row(feed_row("X", "+1555", "code 5555")).await;
    eventually("code after self-check", || h.sent() == 2).await;
    assert_eq!(h.deps.authenticator.login_calls(), 2);

    h.stop().await;
}

#[tokio::test]
async fn test_failed_login_is_retried_until_it_succeeds() {
    let deps = TestDependencies::new();
    deps.authenticator.reject_logins(true);
    let mut h = TestHarness::start(deps);

    eventually("login retried", || h.deps.authenticator.login_calls() >= 2).await;
    assert_eq!(h.session.state(), SessionState::Unauthenticated);
    assert_eq!(h.deps.surface.attach_count(), 0);
    assert_eq!(h.sent(), 0);

    h.deps.authenticator.reject_logins(false);
    eventually("startup after login", || h.sent() == 1).await;
    assert_eq!(h.session.state(), SessionState::Authenticated);

    h.stop().await;
}

#[tokio::test]
async fn test_nothing_is_sent_after_shutdown() {
    let mut h = TestHarness::start(TestDependencies::new());
    eventually("startup message", || h.sent() == 1).await;

    h.stop().await;
    assert!(h.deps.surface.released());

    h.show_row(feed_row("X", "+1555", "code 9999")).await;
    settle().await;
    assert_eq!(h.deps.notifier.attempts(), 1);
}

#[tokio::test]
async fn test_slow_login_within_timeout_still_reaches_feed() {
    let deps = TestDependencies::new()
        .with_authenticator(MockAuthenticator::new().with_login_delay(Duration::from_millis(200)))
        .with_surface(
            MockFeedSurface::new().with_top_row(feed_row("X", "+1555", "Your code is 482913")),
        );
    let mut h = TestHarness::start(deps);

    eventually("startup and OTP messages", || h.sent() == 2).await;
    assert_eq!(h.deps.authenticator.login_calls(), 1);
    assert_eq!(
        h.deps.authenticator.navigations(),
        vec!["https://portal.test/portal/live/my_sms".to_string()]
    );

    h.stop().await;
}

//! Best-effort delivery of notifications.
//!
//! Failures are logged and swallowed; the dedup commit that preceded a
//! notification is never undone and nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::render::{render, startup_event};
use crate::common::{NotificationEvent, RelayError};
use crate::kernel::{BaseNotifier, OutboundMessage};

pub struct NotificationDispatcher {
    notifier: Arc<dyn BaseNotifier>,
    send_timeout: Duration,
    shutdown: CancellationToken,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn BaseNotifier>,
        send_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            notifier,
            send_timeout,
            shutdown,
        }
    }

    /// Forward a confirmed-new record. Returns whether delivery succeeded.
    pub async fn notify(&self, event: &NotificationEvent) -> bool {
        let message = render(event, true);
        let delivered = self.deliver(&message).await;
        if delivered {
            info!(
                code = event.record.code.as_deref().unwrap_or_default(),
                destination = %event.record.destination,
                service = %event.record.service_label,
                "Forwarded OTP"
            );
        }
        delivered
    }

    /// One-time liveness message after the first authenticated attach.
    pub async fn notify_startup(&self, timestamp: &str) -> bool {
        let message = render(&startup_event(timestamp), false);
        let delivered = self.deliver(&message).await;
        if delivered {
            info!("Startup confirmation sent");
        }
        delivered
    }

    async fn deliver(&self, message: &OutboundMessage) -> bool {
        if self.shutdown.is_cancelled() {
            debug!("Shutting down; notification not sent");
            return false;
        }

        let result = match tokio::time::timeout(self.send_timeout, self.notifier.send(message)).await
        {
            Ok(result) => result,
            Err(_) => Err(RelayError::TransportFailure(format!(
                "no answer within {:?}",
                self.send_timeout
            ))),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Notification dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CandidateRecord;
    use crate::kernel::test_dependencies::MockNotifier;

    fn event() -> NotificationEvent {
        NotificationEvent::new(
            CandidateRecord {
                service_label: "X".to_string(),
                destination: "+1555".to_string(),
                code: Some("482913".to_string()),
                raw_message: "Your code is 482913".to_string(),
            },
            "18/10/2026, 17:30:00",
        )
    }

    fn dispatcher(notifier: &Arc<MockNotifier>, shutdown: CancellationToken) -> NotificationDispatcher {
        NotificationDispatcher::new(notifier.clone(), Duration::from_secs(1), shutdown)
    }

    #[tokio::test]
    async fn test_notify_sends_rendered_message() {
        let notifier = Arc::new(MockNotifier::new());
        assert!(dispatcher(&notifier, CancellationToken::new()).notify(&event()).await);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("482913"));
        assert!(sent[0].text.contains("+1555"));
        assert_eq!(sent[0].actions.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed_without_retry() {
        let notifier = Arc::new(MockNotifier::new());
        notifier.fail_sends(true);

        assert!(!dispatcher(&notifier, CancellationToken::new()).notify(&event()).await);
        assert_eq!(notifier.attempts(), 1);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_hung_send_gives_up_after_send_timeout() {
        let notifier = Arc::new(MockNotifier::new().with_delay(Duration::from_secs(5)));
        let dispatcher = NotificationDispatcher::new(
            notifier.clone(),
            Duration::from_millis(50),
            CancellationToken::new(),
        );

        let started = std::time::Instant::now();
        assert!(!dispatcher.notify(&event()).await);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(notifier.attempts(), 1);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_startup_message_has_no_actions() {
        let notifier = Arc::new(MockNotifier::new());
        assert!(
            dispatcher(&notifier, CancellationToken::new())
                .notify_startup("18/10/2026, 17:30:00")
                .await
        );

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].actions.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_sent_after_shutdown() {
        let notifier = Arc::new(MockNotifier::new());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert!(!dispatcher(&notifier, shutdown).notify(&event()).await);
        assert_eq!(notifier.attempts(), 0);
    }
}

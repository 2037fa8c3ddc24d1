//! Relay dependencies (using traits for testability)
//!
//! Central container of the external collaborators the pipeline talks to.
//! Production wiring uses the portal and Telegram adapters; tests use
//! `TestDependencies`.

use std::sync::Arc;

use async_trait::async_trait;
use telegram::{InlineKeyboardButton, InlineKeyboardMarkup, TelegramService};

use crate::common::{RelayError, RelayResult};
use crate::kernel::{
    BaseAuthenticator, BaseDedupStore, BaseFeedSurface, BaseNotifier, OutboundMessage,
};

// =============================================================================
// TelegramService Adapter (implements BaseNotifier trait)
// =============================================================================

/// Wrapper around TelegramService that implements BaseNotifier trait
pub struct TelegramAdapter(pub Arc<TelegramService>);

impl TelegramAdapter {
    pub fn new(service: Arc<TelegramService>) -> Self {
        Self(service)
    }
}

/// One row of buttons, as the chat shows them side by side.
fn keyboard(message: &OutboundMessage) -> Option<InlineKeyboardMarkup> {
    if message.actions.is_empty() {
        return None;
    }

    let row = message
        .actions
        .iter()
        .map(|action| InlineKeyboardButton::url(&action.label, &action.url))
        .collect();

    Some(InlineKeyboardMarkup {
        inline_keyboard: vec![row],
    })
}

#[async_trait]
impl BaseNotifier for TelegramAdapter {
    async fn send(&self, message: &OutboundMessage) -> RelayResult<()> {
        self.0
            .send_message(&message.text, keyboard(message))
            .await
            .map(|_| ())
            .map_err(|e| RelayError::TransportFailure(e.to_string()))
    }
}

// =============================================================================
// RelayDeps
// =============================================================================

/// External collaborators of the pipeline
#[derive(Clone)]
pub struct RelayDeps {
    pub surface: Arc<dyn BaseFeedSurface>,
    pub authenticator: Arc<dyn BaseAuthenticator>,
    pub store: Arc<dyn BaseDedupStore>,
    pub notifier: Arc<dyn BaseNotifier>,
}

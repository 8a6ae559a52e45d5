//! Log-only chat notifier.
//!
//! Stands in for a chat protocol client when the service runs web-only: every
//! notification is written to the log and answered with a fresh message id.

use std::sync::atomic::{AtomicI64, Ordering};

use huddle_core::service::notify::ChatNotifier;
use huddle_types::error::NotifyError;
use huddle_types::ids::ChatId;

pub struct LogNotifier {
    next_message_id: AtomicI64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatNotifier for LogNotifier {
    async fn notify(
        &self,
        chat_id: ChatId,
        content: &str,
        edit_message_id: Option<i64>,
    ) -> Result<i64, NotifyError> {
        let message_id = match edit_message_id {
            Some(id) => id,
            None => self.next_message_id.fetch_add(1, Ordering::Relaxed),
        };
        tracing::info!(
            chat = %chat_id,
            message = message_id,
            edit = edit_message_id.is_some(),
            "chat notification: {content}"
        );
        Ok(message_id)
    }
}

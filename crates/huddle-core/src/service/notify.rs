//! ChatNotifier trait for pushing messages to chat channels.
//!
//! Defined in huddle-core so the session coordinator can reach chat members
//! without coupling to a specific chat protocol client.

use huddle_types::error::NotifyError;
use huddle_types::ids::ChatId;

/// Capability to send (or edit) a message in a chat channel.
pub trait ChatNotifier: Send + Sync {
    /// Send `content` to `chat_id`. With `edit_message_id` set, the existing
    /// message is replaced in place. Returns the id of the message now shown.
    fn notify(
        &self,
        chat_id: ChatId,
        content: &str,
        edit_message_id: Option<i64>,
    ) -> impl std::future::Future<Output = Result<i64, NotifyError>> + Send;
}

//! MailboxRepository trait definition.
//!
//! Per-user bounded message log read by the polling web channel.

use huddle_types::error::RepositoryError;
use huddle_types::ids::UserId;
use huddle_types::mailbox::MailboxBatch;

/// Repository trait for per-user mailboxes.
pub trait MailboxRepository: Send + Sync {
    /// Append `text` after the user's newest message, then trim so that at most
    /// `max_retained` messages remain.
    fn push(
        &self,
        user_id: UserId,
        text: &str,
        max_retained: u32,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Read every retained message newer than `last_seen`, oldest first.
    ///
    /// Non-destructive: repeating a read with the same cursor returns the same batch.
    fn drain_since(
        &self,
        user_id: UserId,
        last_seen: i64,
    ) -> impl std::future::Future<Output = Result<MailboxBatch, RepositoryError>> + Send;
}

//! Mailbox types for the polling web channel.

use serde::{Deserialize, Serialize};

/// Cursor value meaning "nothing seen yet".
pub const CURSOR_START: i64 = -1;

/// Result of a cursor-based mailbox read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxBatch {
    /// Messages with an index above the caller's cursor, oldest first.
    pub messages: Vec<String>,
    /// Highest index observed. Equals the caller's cursor when nothing was new.
    pub last_seen: i64,
}

impl MailboxBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

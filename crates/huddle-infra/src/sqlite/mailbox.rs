//! SQLite mailbox repository implementation.
//!
//! Indices are per user, start at 0 and only grow. Retention is a sliding
//! window over the newest indices, enforced on every push.

use huddle_core::repository::mailbox::MailboxRepository;
use huddle_types::error::RepositoryError;
use huddle_types::ids::UserId;
use huddle_types::mailbox::MailboxBatch;
use sqlx::Row;

use super::store::{SqliteStore, query_err};

impl MailboxRepository for SqliteStore {
    async fn push(
        &self,
        user_id: UserId,
        text: &str,
        max_retained: u32,
    ) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let newest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(message_index) FROM mailbox WHERE user_id = ?")
                .bind(user_id.0)
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err)?;
        let index = newest.map_or(0, |max| max + 1);

        sqlx::query("INSERT INTO mailbox (user_id, message_index, text) VALUES (?, ?, ?)")
            .bind(user_id.0)
            .bind(index)
            .bind(text)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        // A zero cap would drop the message just written.
        let keep = i64::from(max_retained.max(1));
        let trimmed = sqlx::query("DELETE FROM mailbox WHERE user_id = ? AND message_index <= ?")
            .bind(user_id.0)
            .bind(index - keep)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .rows_affected();

        tx.commit().await.map_err(query_err)?;
        tracing::trace!(user = %user_id, index, trimmed, "mailbox push");
        Ok(())
    }

    async fn drain_since(
        &self,
        user_id: UserId,
        last_seen: i64,
    ) -> Result<MailboxBatch, RepositoryError> {
        let _guard = self.lock().await;
        let rows = sqlx::query(
            "SELECT message_index, text FROM mailbox
             WHERE user_id = ? AND message_index > ?
             ORDER BY message_index",
        )
        .bind(user_id.0)
        .bind(last_seen)
        .fetch_all(&self.pool().writer)
        .await
        .map_err(query_err)?;

        let mut batch = MailboxBatch {
            messages: Vec::with_capacity(rows.len()),
            last_seen,
        };
        for row in &rows {
            let index: i64 = row.try_get("message_index").map_err(query_err)?;
            let text: String = row.try_get("text").map_err(query_err)?;
            batch.last_seen = batch.last_seen.max(index);
            batch.messages.push(text);
        }
        Ok(batch)
    }
}

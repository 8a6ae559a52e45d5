//! SQLite web guest repository implementation.

use huddle_core::repository::guest::GuestRepository;
use huddle_types::error::RepositoryError;
use huddle_types::ids::{GuestToken, SessionId, UserId};

use super::store::{SqliteStore, query_err};

impl GuestRepository for SqliteStore {
    async fn add_web_guest(
        &self,
        session_id: SessionId,
        token: GuestToken,
    ) -> Result<bool, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let clash: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_guests WHERE token = ?")
            .bind(token.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_err)?;
        if clash > 0 {
            tracing::debug!(token = %token, "guest token already taken");
            return Ok(false);
        }

        let session: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = ?")
            .bind(session_id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_err)?;
        if session == 0 {
            return Ok(false);
        }

        let user_id = sqlx::query("INSERT INTO users (current_session) VALUES (?)")
            .bind(session_id.0)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .last_insert_rowid();

        sqlx::query("INSERT INTO web_guests (user_id, token) VALUES (?, ?)")
            .bind(user_id)
            .bind(token.0)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        tracing::info!(session = %session_id, user = user_id, "web guest joined");
        Ok(true)
    }

    async fn remove_web_guest(&self, token: GuestToken) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let user_id: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM web_guests WHERE token = ?")
                .bind(token.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_err)?;
        let Some(user_id) = user_id else {
            return Ok(());
        };

        for sql in [
            "DELETE FROM web_guests WHERE user_id = ?",
            "DELETE FROM mailbox WHERE user_id = ?",
            "DELETE FROM users WHERE id = ?",
        ] {
            sqlx::query(sql)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        tracing::info!(user = user_id, "web guest removed");
        Ok(())
    }

    async fn guest_exists(&self, token: GuestToken) -> Result<bool, RepositoryError> {
        let _guard = self.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_guests WHERE token = ?")
            .bind(token.0)
            .fetch_one(&self.pool().writer)
            .await
            .map_err(query_err)?;
        Ok(count > 0)
    }

    async fn guest_user_id(&self, token: GuestToken) -> Result<Option<UserId>, RepositoryError> {
        let _guard = self.lock().await;
        let user_id: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM web_guests WHERE token = ?")
                .bind(token.0)
                .fetch_optional(&self.pool().writer)
                .await
                .map_err(query_err)?;
        Ok(user_id.map(UserId))
    }
}

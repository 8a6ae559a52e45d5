//! SQLite identity repository implementation.
//!
//! Chat identities are created on first contact and never deleted. The
//! identity of a user is resolved with a single query joining both identity
//! tables.

use huddle_core::repository::identity::IdentityRepository;
use huddle_types::error::RepositoryError;
use huddle_types::identity::{ChatIdentity, Identity, WebGuest};
use huddle_types::ids::{ChatId, GuestToken, UserId};
use sqlx::Row;

use super::store::{SqliteStore, query_err};

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct IdentityRow {
    user_id: i64,
    chat_id: Option<i64>,
    chat_language: Option<String>,
    pending_message_id: Option<i64>,
    guest_token: Option<i64>,
}

impl IdentityRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            chat_language: row.try_get("chat_language")?,
            pending_message_id: row.try_get("pending_message_id")?,
            guest_token: row.try_get("token")?,
        })
    }

    fn into_identity(self) -> Result<Identity, RepositoryError> {
        let user_id = UserId(self.user_id);
        match (self.chat_id, self.guest_token) {
            (Some(chat_id), None) => Ok(Identity::Chat(ChatIdentity {
                user_id,
                chat_id: ChatId(chat_id),
                language: self.chat_language.unwrap_or_default(),
                pending_message_id: self.pending_message_id,
            })),
            (None, Some(token)) => Ok(Identity::WebGuest(WebGuest {
                user_id,
                token: GuestToken(token),
            })),
            (Some(_), Some(_)) => Err(RepositoryError::Corrupt(format!(
                "user {user_id} has both a chat identity and a web guest token"
            ))),
            (None, None) => Err(RepositoryError::Corrupt(format!(
                "user {user_id} has no identity"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// IdentityRepository implementation
// ---------------------------------------------------------------------------

impl IdentityRepository for SqliteStore {
    async fn resolve_chat_user(
        &self,
        chat_id: ChatId,
        language_hint: &str,
    ) -> Result<UserId, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM chat_identities WHERE chat_id = ?")
                .bind(chat_id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_err)?;
        if let Some(user_id) = existing {
            return Ok(UserId(user_id));
        }

        let user_id = sqlx::query("INSERT INTO users DEFAULT VALUES")
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .last_insert_rowid();

        sqlx::query("INSERT INTO chat_identities (user_id, chat_id, language) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(chat_id.0)
            .bind(language_hint)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        tracing::debug!(user = user_id, chat = %chat_id, "chat user created");
        Ok(UserId(user_id))
    }

    async fn chat_id_of(&self, user_id: UserId) -> Result<Option<ChatId>, RepositoryError> {
        let _guard = self.lock().await;
        let chat_id: Option<i64> =
            sqlx::query_scalar("SELECT chat_id FROM chat_identities WHERE user_id = ?")
                .bind(user_id.0)
                .fetch_optional(&self.pool().writer)
                .await
                .map_err(query_err)?;
        Ok(chat_id.map(ChatId))
    }

    async fn identity_of(&self, user_id: UserId) -> Result<Option<Identity>, RepositoryError> {
        let _guard = self.lock().await;
        let row = sqlx::query(
            r#"SELECT u.id, c.chat_id, c.language AS chat_language, c.pending_message_id, g.token
               FROM users u
               LEFT JOIN chat_identities c ON c.user_id = u.id
               LEFT JOIN web_guests g ON g.user_id = u.id
               WHERE u.id = ?"#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool().writer)
        .await
        .map_err(query_err)?;

        match row {
            Some(row) => {
                let identity_row = IdentityRow::from_row(&row).map_err(query_err)?;
                Ok(Some(identity_row.into_identity()?))
            }
            None => Ok(None),
        }
    }

    async fn set_language(&self, user_id: UserId, language: &str) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        // Only one of the two rows exists for any user.
        for sql in [
            "UPDATE chat_identities SET language = ? WHERE user_id = ?",
            "UPDATE web_guests SET language = ? WHERE user_id = ?",
        ] {
            sqlx::query(sql)
                .bind(language)
                .bind(user_id.0)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn language_of(&self, user_id: UserId) -> Result<String, RepositoryError> {
        let _guard = self.lock().await;
        let language: Option<String> = sqlx::query_scalar(
            r#"SELECT COALESCE(c.language, g.language, '')
               FROM users u
               LEFT JOIN chat_identities c ON c.user_id = u.id
               LEFT JOIN web_guests g ON g.user_id = u.id
               WHERE u.id = ?"#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool().writer)
        .await
        .map_err(query_err)?;
        Ok(language.unwrap_or_default())
    }

    async fn pending_message_of(&self, user_id: UserId) -> Result<Option<i64>, RepositoryError> {
        let _guard = self.lock().await;
        let pending: Option<Option<i64>> =
            sqlx::query_scalar("SELECT pending_message_id FROM chat_identities WHERE user_id = ?")
                .bind(user_id.0)
                .fetch_optional(&self.pool().writer)
                .await
                .map_err(query_err)?;
        Ok(pending.flatten())
    }

    async fn set_pending_message(
        &self,
        user_id: UserId,
        message_id: i64,
    ) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        sqlx::query("UPDATE chat_identities SET pending_message_id = ? WHERE user_id = ?")
            .bind(message_id)
            .bind(user_id.0)
            .execute(&self.pool().writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

//! SQLite role card repository implementation.

use huddle_core::repository::role::RoleRepository;
use huddle_types::error::RepositoryError;
use huddle_types::ids::UserId;
use huddle_types::session::RoleCard;
use sqlx::Row;

use super::store::{SqliteStore, query_err};

impl RoleRepository for SqliteStore {
    async fn deal_role(&self, user_id: UserId, theme: &str) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        sqlx::query("UPDATE users SET theme = ?, theme_revealed = 0 WHERE id = ?")
            .bind(theme)
            .bind(user_id.0)
            .execute(&self.pool().writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn role_of(&self, user_id: UserId) -> Result<Option<RoleCard>, RepositoryError> {
        let _guard = self.lock().await;
        let row = sqlx::query("SELECT theme, theme_revealed FROM users WHERE id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool().writer)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let theme: Option<String> = row.try_get("theme").map_err(query_err)?;
        let revealed: bool = row.try_get("theme_revealed").map_err(query_err)?;
        Ok(theme.map(|theme| RoleCard { theme, revealed }))
    }

    async fn set_role_revealed(
        &self,
        user_id: UserId,
        revealed: bool,
    ) -> Result<(), RepositoryError> {
        let _guard = self.lock().await;
        sqlx::query("UPDATE users SET theme_revealed = ? WHERE id = ? AND theme IS NOT NULL")
            .bind(revealed)
            .bind(user_id.0)
            .execute(&self.pool().writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }
}

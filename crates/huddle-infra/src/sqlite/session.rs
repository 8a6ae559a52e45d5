//! SQLite session repository implementation.
//!
//! Membership is the `users.current_session` column. A session survives only
//! while at least one member has a chat identity; the leave that removes the
//! last chat member also deletes the remaining web guests, their mailboxes and
//! the session row, inside the same gate acquisition and transaction.

use huddle_core::repository::session::SessionRepository;
use huddle_types::error::RepositoryError;
use huddle_types::ids::{InviteToken, SessionId, UserId};
use huddle_types::session::{JoinOutcome, LeftSession, MemberFilter, SessionSwitch};
use sqlx::SqliteConnection;

use super::store::{SqliteStore, query_err};

// ---------------------------------------------------------------------------
// Helpers running on an already locked connection
// ---------------------------------------------------------------------------

async fn current_session_in(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<SessionId>, RepositoryError> {
    let session: Option<Option<i64>> =
        sqlx::query_scalar("SELECT current_session FROM users WHERE id = ?")
            .bind(user_id.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(query_err)?;
    Ok(session.flatten().map(SessionId))
}

async fn session_exists_in(
    conn: &mut SqliteConnection,
    session_id: SessionId,
) -> Result<bool, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = ?")
        .bind(session_id.0)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_err)?;
    Ok(count > 0)
}

async fn member_count_in(
    conn: &mut SqliteConnection,
    session_id: SessionId,
    filter: MemberFilter,
) -> Result<u64, RepositoryError> {
    let sql = match filter {
        MemberFilter::All => "SELECT COUNT(*) FROM users WHERE current_session = ?",
        MemberFilter::ChatOnly => {
            r#"SELECT COUNT(*) FROM users u
               JOIN chat_identities c ON c.user_id = u.id
               WHERE u.current_session = ?"#
        }
    };
    let count: i64 = sqlx::query_scalar(sql)
        .bind(session_id.0)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_err)?;
    Ok(count as u64)
}

/// Session membership is only ever started by chat users.
async fn require_chat_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_identities WHERE user_id = ?")
        .bind(user_id.0)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_err)?;
    if count == 0 {
        return Err(RepositoryError::NotFound(format!(
            "user {user_id} has no chat identity"
        )));
    }
    Ok(())
}

/// Clear the user's membership, then tear the session down if no chat member is left.
async fn leave_in(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<LeftSession>, RepositoryError> {
    let Some(session_id) = current_session_in(conn, user_id).await? else {
        return Ok(None);
    };

    sqlx::query(
        "UPDATE users SET current_session = NULL, theme = NULL, theme_revealed = 0 WHERE id = ?",
    )
    .bind(user_id.0)
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;

    if member_count_in(conn, session_id, MemberFilter::ChatOnly).await? > 0 {
        tracing::debug!(user = %user_id, session = %session_id, "left session");
        return Ok(Some(LeftSession {
            session_id,
            disposed: false,
        }));
    }

    dispose_in(conn, session_id).await?;
    Ok(Some(LeftSession {
        session_id,
        disposed: true,
    }))
}

/// Delete a session with no chat members left.
///
/// Order: remaining members' mailboxes, their guest rows, the session row,
/// then the guest users themselves. Membership is read at deletion time, so
/// a guest that joined just before the teardown is reaped as well.
async fn dispose_in(
    conn: &mut SqliteConnection,
    session_id: SessionId,
) -> Result<(), RepositoryError> {
    let steps = [
        "DELETE FROM mailbox WHERE user_id IN (SELECT id FROM users WHERE current_session = ?)",
        "DELETE FROM web_guests WHERE user_id IN (SELECT id FROM users WHERE current_session = ?)",
        "DELETE FROM sessions WHERE id = ?",
        "DELETE FROM users WHERE current_session = ?",
    ];
    let mut reaped = 0;
    for sql in steps {
        let result = sqlx::query(sql)
            .bind(session_id.0)
            .execute(&mut *conn)
            .await
            .map_err(query_err)?;
        reaped = result.rows_affected();
    }
    tracing::info!(session = %session_id, guests = reaped, "session disposed");
    Ok(())
}

async fn join_in(
    conn: &mut SqliteConnection,
    user_id: UserId,
    session_id: SessionId,
) -> Result<JoinOutcome, RepositoryError> {
    if !session_exists_in(conn, session_id).await? {
        return Ok(JoinOutcome::SessionNotFound);
    }
    require_chat_user(conn, user_id).await?;

    if current_session_in(conn, user_id).await? == Some(session_id) {
        return Ok(JoinOutcome::Joined {
            previous: Some(session_id),
        });
    }

    let previous = leave_in(conn, user_id).await?.map(|left| left.session_id);

    sqlx::query("UPDATE users SET current_session = ? WHERE id = ?")
        .bind(session_id.0)
        .bind(user_id.0)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;

    tracing::debug!(user = %user_id, session = %session_id, "joined session");
    Ok(JoinOutcome::Joined { previous })
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteStore {
    async fn create_session(&self, user_id: UserId) -> Result<SessionSwitch, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        require_chat_user(&mut tx, user_id).await?;
        let previous = leave_in(&mut tx, user_id).await?.map(|left| left.session_id);

        let token = InviteToken::generate();
        let session_id = sqlx::query("INSERT INTO sessions (invite_token) VALUES (?)")
            .bind(token.as_str())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .last_insert_rowid();

        sqlx::query("UPDATE users SET current_session = ? WHERE id = ?")
            .bind(session_id)
            .bind(user_id.0)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(SessionSwitch {
            session_id: SessionId(session_id),
            previous,
        })
    }

    async fn join_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<JoinOutcome, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let outcome = join_in(&mut tx, user_id, session_id).await?;

        tx.commit().await.map_err(query_err)?;
        Ok(outcome)
    }

    async fn join_by_token(
        &self,
        user_id: UserId,
        token: &InviteToken,
    ) -> Result<Option<SessionId>, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let session: Option<i64> =
            sqlx::query_scalar("SELECT id FROM sessions WHERE invite_token = ?")
                .bind(token.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_err)?;
        let Some(session_id) = session.map(SessionId) else {
            return Ok(None);
        };

        let outcome = join_in(&mut tx, user_id, session_id).await?;

        tx.commit().await.map_err(query_err)?;
        Ok(outcome.succeeded().then_some(session_id))
    }

    async fn leave_session(&self, user_id: UserId) -> Result<Option<LeftSession>, RepositoryError> {
        let _guard = self.lock().await;
        let mut tx = self.pool().writer.begin().await.map_err(query_err)?;

        let left = leave_in(&mut tx, user_id).await?;

        tx.commit().await.map_err(query_err)?;
        Ok(left)
    }

    async fn session_exists(&self, session_id: SessionId) -> Result<bool, RepositoryError> {
        let _guard = self.lock().await;
        let mut conn = self.pool().writer.acquire().await.map_err(query_err)?;
        session_exists_in(&mut conn, session_id).await
    }

    async fn current_session(&self, user_id: UserId) -> Result<Option<SessionId>, RepositoryError> {
        let _guard = self.lock().await;
        let mut conn = self.pool().writer.acquire().await.map_err(query_err)?;
        current_session_in(&mut conn, user_id).await
    }

    async fn member_count(
        &self,
        session_id: SessionId,
        filter: MemberFilter,
    ) -> Result<u64, RepositoryError> {
        let _guard = self.lock().await;
        let mut conn = self.pool().writer.acquire().await.map_err(query_err)?;
        member_count_in(&mut conn, session_id, filter).await
    }

    async fn members_of(&self, session_id: SessionId) -> Result<Vec<UserId>, RepositoryError> {
        let _guard = self.lock().await;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE current_session = ?")
            .bind(session_id.0)
            .fetch_all(&self.pool().writer)
            .await
            .map_err(query_err)?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn token_of(&self, session_id: SessionId) -> Result<Option<InviteToken>, RepositoryError> {
        let _guard = self.lock().await;
        let token: Option<String> =
            sqlx::query_scalar("SELECT invite_token FROM sessions WHERE id = ?")
                .bind(session_id.0)
                .fetch_optional(&self.pool().writer)
                .await
                .map_err(query_err)?;
        Ok(token.map(InviteToken))
    }

    async fn session_of(&self, token: &InviteToken) -> Result<Option<SessionId>, RepositoryError> {
        let _guard = self.lock().await;
        let session: Option<i64> =
            sqlx::query_scalar("SELECT id FROM sessions WHERE invite_token = ?")
                .bind(token.as_str())
                .fetch_optional(&self.pool().writer)
                .await
                .map_err(query_err)?;
        Ok(session.map(SessionId))
    }
}

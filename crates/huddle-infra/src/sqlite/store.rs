//! The session and identity store.
//!
//! `SqliteStore` owns the database pool together with the gate that makes
//! every store call mutually exclusive. Each public operation takes the gate
//! once and holds it for its whole duration, so compound check-then-act
//! sequences (leave and maybe tear down, leave then join) never interleave
//! with another call. Multi-statement mutations also run in one transaction.

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use huddle_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::schema;

/// SQLite-backed implementation of every repository trait in `huddle-core`.
pub struct SqliteStore {
    pool: DatabasePool,
    gate: Mutex<()>,
}

impl SqliteStore {
    /// Wrap an already migrated pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            gate: Mutex::new(()),
        }
    }

    /// Connect, migrate and wrap in one step.
    pub async fn open(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = DatabasePool::new(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Take the store-wide gate.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Row counts and schema version, for the status command.
    pub async fn stats(&self) -> Result<StoreStats, RepositoryError> {
        let _guard = self.lock().await;
        let writer = &self.pool.writer;

        let mut counts = [0i64; 5];
        for (slot, table) in counts.iter_mut().zip([
            "users",
            "chat_identities",
            "web_guests",
            "sessions",
            "mailbox",
        ]) {
            *slot = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(writer)
                .await
                .map_err(query_err)?;
        }
        let [users, chat_users, web_guests, sessions, mailbox_messages] = counts;

        Ok(StoreStats {
            schema_version: schema::current_version(writer).await?,
            users,
            chat_users,
            web_guests,
            sessions,
            mailbox_messages,
        })
    }
}

/// Snapshot of the store's size.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub schema_version: Option<String>,
    pub users: i64,
    pub chat_users: i64,
    pub web_guests: i64,
    pub sessions: i64,
    pub mailbox_messages: i64,
}

pub(crate) fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

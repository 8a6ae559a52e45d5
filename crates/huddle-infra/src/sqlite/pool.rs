//! Single-writer SQLite pool in WAL mode.
//!
//! The store serializes every call behind its own gate, so one connection is
//! all it ever uses. The schema is brought up to date before the pool is
//! handed out.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use huddle_types::error::RepositoryError;

use super::schema;

/// Single-connection pool for SQLite with WAL mode.
#[derive(Clone)]
pub struct DatabasePool {
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Connect and run pending schema upgrades.
    ///
    /// Uses WAL journal mode, foreign key enforcement and a 5-second busy timeout.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepositoryError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        schema::migrate(&writer).await?;

        Ok(Self { writer })
    }
}

/// Database URL for `huddle.db` inside the data directory.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("huddle.db").display())
}

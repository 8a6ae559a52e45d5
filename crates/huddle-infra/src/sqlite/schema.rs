//! Schema creation and versioned upgrades.
//!
//! The current schema version lives in the single-row `schema_version` table.
//! A fresh database gets the latest schema directly; an older one is walked
//! through every upgrade step after its recorded version, in order. Files
//! without that table may carry their version in a `global_vars` row named
//! `version`; a file with neither but with a `users` table is taken as 0.1.
//! The whole run happens in one transaction before the store is opened for use.

use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;

use huddle_types::error::RepositoryError;

/// Oldest layout that can still be upgraded.
pub const MINIMAL_VERSION: &str = "0.1";
/// Version written after creation or a successful upgrade.
pub const LATEST_VERSION: &str = "0.3";

const CREATE_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version TEXT NOT NULL
)";

// `users.current_session` carries no foreign key: teardown deletes the
// session row before the guest users still pointing at it.
const LATEST_SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        current_session INTEGER,
        theme TEXT,
        theme_revealed INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX idx_users_current_session ON users(current_session)",
    "CREATE TABLE chat_identities (
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
        chat_id INTEGER NOT NULL UNIQUE,
        language TEXT NOT NULL DEFAULT '',
        pending_message_id INTEGER
    )",
    "CREATE TABLE web_guests (
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
        token INTEGER NOT NULL UNIQUE,
        language TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invite_token TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE mailbox (
        user_id INTEGER NOT NULL REFERENCES users(id),
        message_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        PRIMARY KEY (user_id, message_index)
    )",
];

/// Version under which a `global_vars` record denotes the `telegram_users` layout.
const TELEGRAM_USERS_VERSION: &str = "0.2";

// Rewrites the `telegram_users` layout into the 0.2 layout below.
const TELEGRAM_USERS_BRIDGE: &[&str] = &[
    "CREATE TABLE chat_identities (
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
        chat_id INTEGER NOT NULL UNIQUE,
        language TEXT NOT NULL DEFAULT '',
        pending_message_id INTEGER
    )",
    "INSERT INTO chat_identities (user_id, chat_id, language, pending_message_id)
     SELECT user_id, chat_id, IFNULL(language, ''), NULLIF(current_session_message, 0) FROM telegram_users",
    "DROP TABLE telegram_users",
];

/// One upgrade step, bringing the schema *to* `version`.
struct Upgrade {
    version: &'static str,
    statements: &'static [&'static str],
}

const UPGRADES: &[Upgrade] = &[
    // Chat fields move off `users` into their own identity table.
    Upgrade {
        version: "0.2",
        statements: &[
            "ALTER TABLE users RENAME TO users_legacy",
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                current_session INTEGER
            )",
            "INSERT INTO users (id, current_session) SELECT id, current_session FROM users_legacy",
            "CREATE TABLE chat_identities (
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
                chat_id INTEGER NOT NULL UNIQUE,
                language TEXT NOT NULL DEFAULT '',
                pending_message_id INTEGER
            )",
            "INSERT INTO chat_identities (user_id, chat_id, language, pending_message_id)
             SELECT id, chat_id, IFNULL(language, ''), NULLIF(current_session_message, 0) FROM users_legacy",
            "DROP TABLE users_legacy",
        ],
    },
    // Web guests, mailboxes and role cards.
    Upgrade {
        version: "0.3",
        statements: &[
            "ALTER TABLE users ADD COLUMN theme TEXT",
            "ALTER TABLE users ADD COLUMN theme_revealed INTEGER NOT NULL DEFAULT 0",
            "CREATE INDEX idx_users_current_session ON users(current_session)",
            "CREATE TABLE sessions_next (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                invite_token TEXT NOT NULL UNIQUE
            )",
            "INSERT INTO sessions_next (id, invite_token) SELECT id, token FROM sessions",
            "DROP TABLE sessions",
            "ALTER TABLE sessions_next RENAME TO sessions",
            "CREATE TABLE web_guests (
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
                token INTEGER NOT NULL UNIQUE,
                language TEXT NOT NULL DEFAULT ''
            )",
            "CREATE TABLE mailbox (
                user_id INTEGER NOT NULL REFERENCES users(id),
                message_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                PRIMARY KEY (user_id, message_index)
            )",
        ],
    },
];

/// Bring the database schema up to [`LATEST_VERSION`].
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await.map_err(migration_err)?;

    sqlx::query(CREATE_VERSION_TABLE)
        .execute(&mut *tx)
        .await
        .map_err(migration_err)?;

    let recorded = read_version(&mut tx).await?;
    let legacy = match recorded {
        Some(_) => None,
        None => read_global_vars_version(&mut tx).await?,
    };
    let unversioned = table_exists(&mut tx, "users").await?;

    let from = match (recorded, legacy) {
        (Some(version), _) => version,
        (None, Some(version)) if version == TELEGRAM_USERS_VERSION => {
            tracing::info!("converting telegram_users into chat_identities");
            run_statements(&mut tx, TELEGRAM_USERS_BRIDGE, "telegram_users").await?;
            version
        }
        (None, Some(version)) => version,
        (None, None) if unversioned => MINIMAL_VERSION.to_string(),
        (None, None) => {
            tracing::info!("creating schema version {LATEST_VERSION}");
            run_statements(&mut tx, LATEST_SCHEMA, LATEST_VERSION).await?;
            write_version(&mut tx, LATEST_VERSION).await?;
            tx.commit().await.map_err(migration_err)?;
            return Ok(());
        }
    };

    let pending = pending_upgrades(&from)?;
    if !pending.is_empty() {
        tracing::info!(
            "upgrading schema from {from} to {LATEST_VERSION} in {} steps",
            pending.len()
        );
    }
    for upgrade in pending {
        tracing::info!("upgrading schema to {}", upgrade.version);
        run_statements(&mut tx, upgrade.statements, upgrade.version).await?;
    }

    write_version(&mut tx, LATEST_VERSION).await?;
    tx.commit().await.map_err(migration_err)?;
    Ok(())
}

/// Recorded schema version, `None` for a database that has never been migrated.
pub async fn current_version(pool: &SqlitePool) -> Result<Option<String>, RepositoryError> {
    let mut conn = pool.acquire().await.map_err(migration_err)?;
    if !table_exists(&mut conn, "schema_version").await? {
        return Ok(None);
    }
    read_version(&mut conn).await
}

/// Steps to run after `from`, ending at the latest version.
fn pending_upgrades(from: &str) -> Result<&'static [Upgrade], RepositoryError> {
    if from == LATEST_VERSION {
        return Ok(&[]);
    }
    if from == MINIMAL_VERSION {
        return Ok(UPGRADES);
    }
    UPGRADES
        .iter()
        .position(|u| u.version == from)
        .map(|idx| &UPGRADES[idx + 1..])
        .ok_or_else(|| RepositoryError::Migration(format!("unknown schema version '{from}'")))
}

async fn run_statements(
    conn: &mut SqliteConnection,
    statements: &[&str],
    step: &str,
) -> Result<(), RepositoryError> {
    for statement in statements {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::Migration(format!("step {step}: {e}")))?;
    }
    Ok(())
}

/// Version kept in a `global_vars` table, if the file has one.
async fn read_global_vars_version(
    conn: &mut SqliteConnection,
) -> Result<Option<String>, RepositoryError> {
    if !table_exists(conn, "global_vars").await? {
        return Ok(None);
    }
    sqlx::query_scalar::<_, Option<String>>(
        "SELECT string_value FROM global_vars WHERE name = 'version'",
    )
        .fetch_optional(&mut *conn)
        .await
        .map_err(migration_err)
        .map(Option::flatten)
}

async fn read_version(conn: &mut SqliteConnection) -> Result<Option<String>, RepositoryError> {
    sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await
        .map_err(migration_err)
}

async fn write_version(conn: &mut SqliteConnection, version: &str) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO schema_version (id, version) VALUES (1, ?)
         ON CONFLICT (id) DO UPDATE SET version = excluded.version",
    )
    .bind(version)
    .execute(&mut *conn)
    .await
    .map_err(migration_err)?;
    Ok(())
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool, RepositoryError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await
            .map_err(migration_err)?;
    Ok(count > 0)
}

fn migration_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Migration(e.to_string())
}

use thiserror::Error;

/// Errors from store operations.
///
/// Lookups that find nothing are not errors; they come back as `None`,
/// `false` or an outcome enum. These variants mean the storage itself failed.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("schema migration error: {0}")]
    Migration(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The caller passed an id that must exist for the operation to make sense.
    #[error("entity not found: {0}")]
    NotFound(String),
}

/// Errors from the chat notification collaborator.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("chat {0} is unreachable")]
    Unreachable(i64),

    #[error("notification transport error: {0}")]
    Transport(String),
}

/// Errors from session coordination.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("no spyfall locations configured")]
    NoLocations,
}

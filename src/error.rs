//! Error kinds shared by the engines and the HTTP layer.

use thiserror::Error;

/// Failure of a cart or order operation.
///
/// Every variant maps to exactly one HTTP status in [`crate::api`]; the mapping is
/// the only place the kind is interpreted.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// No usable caller identity (missing, invalid or expired token).
    #[error("{0}")]
    Unauthenticated(String),

    /// The caller has no rights over the entity.
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    /// A state precondition does not hold: already cancelled, insufficient stock,
    /// lost optimistic-concurrency race.
    #[error("{0}")]
    Conflict(String),

    /// Storage or infrastructure failure. The detail is logged, never returned to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }
}

/// Storage failure reported by a repository implementation.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<RepositoryError> for Error {
    fn from(e: RepositoryError) -> Self {
        Self::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

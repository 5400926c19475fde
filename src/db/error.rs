use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Errors raised by the data-access layer.
///
/// Constraint violations reported by SQLite are classified on conversion so
/// callers can tell a duplicate name from a broken reference without parsing
/// error messages.
#[derive(Debug, Error)]
pub enum DbError {
    /// A referenced row does not exist. Carries the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// A CHECK, NOT NULL or foreign-key constraint rejected the write, or the
    /// input breaks a rule enforced here (e.g. cross-project references).
    #[error("{0}")]
    Invalid(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Replace the engine's message of a [`DbError::Conflict`] with a readable one.
    pub(crate) fn conflict_as(self, message: impl FnOnce() -> String) -> Self {
        match self {
            Self::Conflict(_) => Self::Conflict(message()),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, msg) = &e {
            let detail = msg.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_CHECK
                | ffi::SQLITE_CONSTRAINT_NOTNULL
                | ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::Invalid(detail);
                }
                _ => {}
            }
        }
        Self::Sqlite(e)
    }
}

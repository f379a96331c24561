pub mod pool;
pub mod sqlite;
pub mod repository;

pub use pool::*;
pub use sqlite::*;
pub use repository::*;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Foreign-key, CHECK, NOT NULL and trigger aborts all arrive as
/// `SQLITE_CONSTRAINT`; they are split out so callers can answer 400
/// instead of 500.
impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                DatabaseError::ConstraintViolation(
                    message.clone().unwrap_or_else(|| err.to_string()),
                )
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}

impl DatabaseError {
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DatabaseError::ConstraintViolation(msg) if msg.contains("FOREIGN KEY"))
    }
}

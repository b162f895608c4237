pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Slot already booked")]
    SlotTaken,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

impl DatabaseError {
    /// Classify a failed insert/update: UNIQUE violations on the open-slot
    /// index become `SlotTaken`, other UNIQUE violations `Duplicate`.
    pub(crate) fn from_write(err: rusqlite::Error, entity: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                let msg = msg.as_deref().unwrap_or_default();
                if msg.contains("appointments.doctor_id") {
                    DatabaseError::SlotTaken
                } else {
                    DatabaseError::Duplicate(entity.to_string())
                }
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}

//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`; callers own locking and
//! transactions.

mod appointment;
mod background;
mod doctor;
mod patient;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use background::*;
pub use doctor::*;
pub use patient::*;

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp '{s}': {e}")))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date '{s}': {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_format_round_trip() {
        let ts = fixtures::at(10, 9);
        let s = format_timestamp(&ts);
        assert_eq!(s, "2025-03-10 09:00:00");
        assert_eq!(parse_timestamp(&s).unwrap(), ts);
    }

    #[test]
    fn malformed_values_are_constraint_violations() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
        assert!(matches!(parse_date("2025-13-01"), Err(DatabaseError::ConstraintViolation(_))));
        assert!(matches!(parse_uuid("nope"), Err(DatabaseError::ConstraintViolation(_))));
    }
}

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Doctor;

/// Insert or refresh a roster entry. The department lives on the
/// appointment, not on the doctor row, so multi-department doctors are
/// stored once.
pub fn upsert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, name, experience_years, rating)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            experience_years = excluded.experience_years,
            rating = excluded.rating",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.experience_years,
            doctor.rating,
        ],
    )?;
    Ok(())
}

/// Mirror the whole roster in one transaction. Returns the number of
/// distinct doctors written.
pub fn sync_doctors(conn: &Connection, roster: &[Doctor]) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let mut seen = std::collections::HashSet::new();
    for doctor in roster {
        if seen.insert(doctor.id) {
            upsert_doctor(&tx, doctor)?;
        }
    }
    tx.commit()?;
    Ok(seen.len())
}

pub fn get_doctor_name(conn: &Connection, id: &Uuid) -> Result<Option<String>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT name FROM doctors WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?)
}

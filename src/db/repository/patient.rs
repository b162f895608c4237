use chrono::{Local, Timelike};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{NewPatient, Patient};

/// Insert a new patient. A second registration with the same TC number
/// fails with `Duplicate`.
pub fn insert_patient(conn: &Connection, new: &NewPatient) -> Result<Patient, DatabaseError> {
    let now = Local::now().naive_local();
    let patient = Patient {
        id: Uuid::new_v4(),
        tc_number: new.tc_number.clone(),
        name: new.name.clone(),
        date_of_birth: new.date_of_birth,
        phone: new.phone.clone(),
        email: new.email.clone(),
        created_at: now.with_nanosecond(0).unwrap_or(now),
    };

    conn.execute(
        "INSERT INTO patients (id, tc_number, name, date_of_birth, phone, email, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.id.to_string(),
            patient.tc_number,
            patient.name,
            patient.date_of_birth.to_string(),
            patient.phone,
            patient.email,
            format_timestamp(&patient.created_at),
        ],
    )
    .map_err(|e| DatabaseError::from_write(e, "patient"))?;

    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, tc_number, name, date_of_birth, phone, email, created_at
             FROM patients WHERE id = ?1",
            params![id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

pub fn get_patient_by_tc(
    conn: &Connection,
    tc_number: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, tc_number, name, date_of_birth, phone, email, created_at
             FROM patients WHERE tc_number = ?1",
            params![tc_number],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

struct PatientRow {
    id: String,
    tc_number: String,
    name: String,
    date_of_birth: String,
    phone: String,
    email: String,
    created_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        tc_number: row.get(1)?,
        name: row.get(2)?,
        date_of_birth: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        tc_number: row.tc_number,
        name: row.name,
        date_of_birth: parse_date(&row.date_of_birth)?,
        phone: row.phone,
        email: row.email,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

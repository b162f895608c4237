use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus, DepartmentVisit};

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, department, scheduled_at, status, symptoms, diagnosis";

/// Insert a booking. A second scheduled row for the same doctor and
/// timestamp trips the open-slot index and comes back as `SlotTaken`.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let now = format_timestamp(&Local::now().naive_local());
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, department, scheduled_at,
         status, symptoms, diagnosis, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.department,
            format_timestamp(&appt.scheduled_at),
            appt.status.as_str(),
            appt.symptoms,
            appt.diagnosis,
            now,
        ],
    )
    .map_err(|e| DatabaseError::from_write(e, "appointment"))?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Scheduled bookings of one doctor with `from <= scheduled_at <= to`.
pub fn list_scheduled_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_id = ?1 AND status = 'scheduled'
           AND scheduled_at >= ?2 AND scheduled_at <= ?3
         ORDER BY scheduled_at ASC"
    ))?;
    let rows = stmt.query_map(
        params![doctor_id.to_string(), format_timestamp(from), format_timestamp(to)],
        |row| Ok(appointment_row_from_rusqlite(row)),
    )?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row??)?);
    }
    Ok(appts)
}

/// Every appointment of a patient, oldest first.
pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE patient_id = ?1
         ORDER BY scheduled_at ASC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(appointment_row_from_rusqlite(row))
    })?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row??)?);
    }
    Ok(appts)
}

/// Compare-and-set status change. Returns false when the row is missing or
/// its status is no longer `from`, so concurrent transitions cannot both win.
pub fn transition_appointment_status(
    conn: &Connection,
    id: &Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
    diagnosis: Option<&str>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET status = ?1, diagnosis = COALESCE(?2, diagnosis), updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![
            to.as_str(),
            diagnosis,
            format_timestamp(&Local::now().naive_local()),
            id.to_string(),
            from.as_str(),
        ],
    )?;
    Ok(changed > 0)
}

/// Move a scheduled appointment to a new timestamp. Returns false when the
/// appointment is no longer scheduled.
pub fn reschedule_appointment(
    conn: &Connection,
    id: &Uuid,
    new_time: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE appointments SET scheduled_at = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'scheduled'",
            params![
                format_timestamp(new_time),
                format_timestamp(&Local::now().naive_local()),
                id.to_string(),
            ],
        )
        .map_err(|e| DatabaseError::from_write(e, "appointment"))?;
    Ok(changed > 0)
}

/// Visit history joined with the doctor's display name, oldest first.
pub fn list_department_visits(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<DepartmentVisit>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.department, a.scheduled_at, d.name, a.status, a.diagnosis
         FROM appointments a
         JOIN doctors d ON d.id = a.doctor_id
         WHERE a.patient_id = ?1
         ORDER BY a.scheduled_at ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut visits = Vec::new();
    for row in rows {
        let (department, scheduled_at, doctor_name, status, diagnosis) = row?;
        visits.push(DepartmentVisit {
            department,
            scheduled_at: parse_timestamp(&scheduled_at)?,
            doctor_name,
            status: AppointmentStatus::from_str(&status)?,
            diagnosis,
        });
    }
    Ok(visits)
}

struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    department: String,
    scheduled_at: String,
    status: String,
    symptoms: Option<String>,
    diagnosis: Option<String>,
}

fn appointment_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        department: row.get(3)?,
        scheduled_at: row.get(4)?,
        status: row.get(5)?,
        symptoms: row.get(6)?,
        diagnosis: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        department: row.department,
        scheduled_at: parse_timestamp(&row.scheduled_at)?,
        status: AppointmentStatus::from_str(&row.status)?,
        symptoms: row.symptoms,
        diagnosis: row.diagnosis,
    })
}

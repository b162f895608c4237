use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{PatientCondition, PatientMedication};

pub fn insert_condition(
    conn: &Connection,
    condition: &PatientCondition,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_conditions (id, patient_id, condition, diagnosed_on, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            condition.id.to_string(),
            condition.patient_id.to_string(),
            condition.condition,
            condition.diagnosed_on.map(|d| d.to_string()),
            condition.notes,
        ],
    )?;
    Ok(())
}

pub fn insert_patient_medication(
    conn: &Connection,
    med: &PatientMedication,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_medications (id, patient_id, name, dosage, frequency, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.dosage,
            med.frequency,
            med.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn list_conditions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientCondition>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, condition, diagnosed_on, notes
         FROM patient_conditions WHERE patient_id = ?1
         ORDER BY diagnosed_on ASC, condition ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut conditions = Vec::new();
    for row in rows {
        let (id, patient_id, condition, diagnosed_on, notes) = row?;
        conditions.push(PatientCondition {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            condition,
            diagnosed_on: diagnosed_on.as_deref().map(parse_date).transpose()?,
            notes,
        });
    }
    Ok(conditions)
}

pub fn list_patient_medications(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientMedication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, dosage, frequency, is_active
         FROM patient_medications WHERE patient_id = ?1
         ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i32>(5)?,
        ))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        let (id, patient_id, name, dosage, frequency, is_active) = row?;
        meds.push(PatientMedication {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            name,
            dosage,
            frequency,
            is_active: is_active != 0,
        });
    }
    Ok(meds)
}

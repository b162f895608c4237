use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered patient, keyed externally by the 11-digit TC identity number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub tc_number: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub tc_number: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCondition {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub condition: String,
    pub diagnosed_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientMedication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub is_active: bool,
}

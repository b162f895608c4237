use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub department: String,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
}

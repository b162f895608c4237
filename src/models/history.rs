use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::patient::{PatientCondition, PatientMedication};

/// One past (or upcoming) visit, oldest first in `PatientHistory::visits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentVisit {
    pub department: String,
    pub scheduled_at: NaiveDateTime,
    pub doctor_name: String,
    pub status: AppointmentStatus,
    pub diagnosis: Option<String>,
}

/// Read-only background used to bias department ranking and to add
/// patient-specific notes to an intake result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientHistory {
    pub visits: Vec<DepartmentVisit>,
    pub conditions: Vec<PatientCondition>,
    pub medications: Vec<PatientMedication>,
}

impl PatientHistory {
    /// True when any recorded visit (cancelled ones excluded) was to `department`.
    pub fn has_visited(&self, department: &str) -> bool {
        self.visits
            .iter()
            .any(|v| v.status != AppointmentStatus::Cancelled && v.department == department)
    }

    pub fn active_medications(&self) -> impl Iterator<Item = &PatientMedication> {
        self.medications.iter().filter(|m| m.is_active)
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty() && self.conditions.is_empty() && self.medications.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::{AppointmentStatus, Doctor, PriorityLevel, Severity};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// What the patient told intake. Either a free sentence or the
/// structured form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymptomReport {
    FreeText { text: String },
    Structured(StructuredSymptoms),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSymptoms {
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
    /// The intake form pre-selects `moderate`.
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_severity() -> Severity {
    Severity::Moderate
}

impl SymptomReport {
    pub fn free_text(text: impl Into<String>) -> Self {
        Self::FreeText { text: text.into() }
    }

    /// Everything the patient wrote, joined into one lowercase-able string.
    pub fn combined_text(&self) -> String {
        match self {
            Self::FreeText { text } => text.clone(),
            Self::Structured(s) => s
                .primary
                .iter()
                .chain(s.secondary.iter())
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::FreeText { .. } => None,
            Self::Structured(s) => Some(s.severity),
        }
    }

    /// Reject input the matcher cannot meaningfully read. Empty free text
    /// is accepted; it routes through the fallback.
    pub fn validate(&self, max_chars: usize) -> Result<(), TriageError> {
        if let Self::Structured(s) = self {
            if s.primary.iter().all(|p| p.trim().is_empty()) {
                return Err(TriageError::InvalidInput(
                    "at least one primary symptom is required".into(),
                ));
            }
        }
        let len = self.combined_text().chars().count();
        if len > max_chars {
            return Err(TriageError::InvalidInput(format!(
                "symptom description is too long ({len} characters, limit {max_chars})"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Component outputs
// ---------------------------------------------------------------------------

/// Result of the keyword pass over the symptom text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMatch {
    /// Candidate department tags in department-table order, no duplicates.
    pub departments: Vec<String>,
    /// Symptom keys that matched, in symptom-table order.
    pub matched_symptoms: Vec<String>,
    pub initial_treatments: Vec<String>,
    pub warnings: Vec<String>,
    pub priority: PriorityLevel,
    /// True when nothing matched and `departments` is the whole table.
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentScore {
    pub department: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDoctor {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRecommendation {
    pub department: String,
    pub display_name: String,
    /// Similarity in [0, 1].
    pub confidence: f64,
    pub reason: String,
}

/// Everything intake hands back for one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub priority: PriorityLevel,
    pub recommendations: Vec<DepartmentRecommendation>,
    /// Raw keyword-matcher departments (whole table on fallback).
    pub candidate_departments: Vec<String>,
    pub matched_symptoms: Vec<String>,
    pub initial_treatments: Vec<String>,
    pub warnings: Vec<String>,
    pub doctors: Vec<RankedDoctor>,
    pub patient_notes: Vec<String>,
    pub preparation_notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// TriageError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Unknown department: {0}")]
    InvalidDepartment(String),

    #[error("No doctors available for the requested departments")]
    EmptyCandidateSet,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("The requested slot is no longer available")]
    SlotConflict,

    #[error("Cannot move an appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Storage error: {0}")]
    Storage(#[source] DatabaseError),

    #[error("Reference data failed ({0}): {1}")]
    ReferenceData(String, String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal lock failed")]
    LockFailed,
}

impl From<DatabaseError> for TriageError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::SlotTaken => TriageError::SlotConflict,
            DatabaseError::LockPoisoned => TriageError::LockFailed,
            other => TriageError::Storage(other),
        }
    }
}

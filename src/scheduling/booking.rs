use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::availability::AvailabilityChecker;
use super::store::AppointmentStore;
use crate::models::{
    Appointment, AppointmentStatus, NewPatient, Patient, PatientCondition, PatientHistory,
    PatientMedication,
};
use crate::routing::{ReferenceData, TriageError};
use crate::routing_config::RoutingConfig;

pub const TC_NUMBER_LEN: usize = 11;

/// TC identity numbers are exactly eleven ASCII digits.
pub fn validate_tc_number(tc_number: &str) -> Result<(), TriageError> {
    if tc_number.len() == TC_NUMBER_LEN && tc_number.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(TriageError::InvalidInput(format!(
            "TC number must be {TC_NUMBER_LEN} digits"
        )))
    }
}

/// Booking front door: validates requests against the roster and the slot
/// grid before they reach the store.
pub struct Scheduler {
    store: Arc<dyn AppointmentStore>,
    reference: Arc<ReferenceData>,
    availability: AvailabilityChecker,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        reference: Arc<ReferenceData>,
        config: &RoutingConfig,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(Arc::clone(&store), config),
            store,
            reference,
        }
    }

    pub fn store(&self) -> &dyn AppointmentStore {
        self.store.as_ref()
    }

    /// Mirror the reference roster into the store.
    pub fn sync_roster(&self) -> Result<usize, TriageError> {
        self.store.sync_doctor_roster(&self.reference.doctors)
    }

    pub fn register_patient(&self, new: &NewPatient) -> Result<Patient, TriageError> {
        validate_tc_number(&new.tc_number)?;
        if new.name.trim().is_empty() {
            return Err(TriageError::InvalidInput("patient name is required".into()));
        }
        self.store.register_patient(new)
    }

    pub fn find_patient(&self, tc_number: &str) -> Result<Patient, TriageError> {
        validate_tc_number(tc_number)?;
        self.store
            .find_patient(tc_number)?
            .ok_or(TriageError::PatientNotFound)
    }

    /// Visits, conditions and medications for the patient with this TC number.
    pub fn patient_history(&self, tc_number: &str) -> Result<PatientHistory, TriageError> {
        let patient = self.find_patient(tc_number)?;
        self.store.patient_history(&patient.id)
    }

    /// Record a chronic condition for the patient with this TC number.
    pub fn record_condition(
        &self,
        tc_number: &str,
        condition: &str,
        diagnosed_on: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<PatientCondition, TriageError> {
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(TriageError::InvalidInput("condition name is required".into()));
        }
        let patient = self.find_patient(tc_number)?;
        let record = PatientCondition {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            condition: condition.to_string(),
            diagnosed_on,
            notes: notes.map(str::to_string),
        };
        self.store.record_condition(&record)?;
        Ok(record)
    }

    /// Record a medication the patient takes (or used to, when `is_active`
    /// is false).
    pub fn record_medication(
        &self,
        tc_number: &str,
        name: &str,
        dosage: &str,
        frequency: &str,
        is_active: bool,
    ) -> Result<PatientMedication, TriageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TriageError::InvalidInput("medication name is required".into()));
        }
        let patient = self.find_patient(tc_number)?;
        let record = PatientMedication {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            name: name.to_string(),
            dosage: dosage.trim().to_string(),
            frequency: frequency.trim().to_string(),
            is_active,
        };
        self.store.record_medication(&record)?;
        Ok(record)
    }

    pub fn appointments_for(&self, tc_number: &str) -> Result<Vec<Appointment>, TriageError> {
        let patient = self.find_patient(tc_number)?;
        self.store.list_patient_appointments(&patient.id)
    }

    pub fn available_slots(
        &self,
        doctor_id: &Uuid,
        window_start: NaiveDateTime,
        window_days: Option<u32>,
    ) -> Result<Vec<NaiveDateTime>, TriageError> {
        if !self.reference.doctors.iter().any(|d| d.id == *doctor_id) {
            return Err(TriageError::DoctorNotFound);
        }
        self.availability.availability(doctor_id, window_start, window_days)
    }

    /// Book `doctor_id` in `department` at `scheduled_at`. A lost race
    /// surfaces as `SlotConflict`; re-query availability and pick again.
    pub fn book(
        &self,
        tc_number: &str,
        doctor_id: &Uuid,
        department: &str,
        scheduled_at: NaiveDateTime,
        symptoms: Option<&str>,
    ) -> Result<Appointment, TriageError> {
        if !self.reference.is_known_department(department) {
            return Err(TriageError::InvalidDepartment(department.to_string()));
        }
        if self.reference.doctor_in(doctor_id, department).is_none() {
            return Err(TriageError::DoctorNotFound);
        }
        self.check_slot(&scheduled_at)?;
        let patient = self.find_patient(tc_number)?;
        self.store
            .create_appointment(&patient.id, doctor_id, scheduled_at, department, symptoms)
    }

    pub fn reschedule(
        &self,
        appointment_id: &Uuid,
        new_time: NaiveDateTime,
    ) -> Result<Appointment, TriageError> {
        self.check_slot(&new_time)?;
        self.store.reschedule_appointment(appointment_id, new_time)
    }

    pub fn cancel(&self, appointment_id: &Uuid) -> Result<Appointment, TriageError> {
        self.store
            .update_appointment_status(appointment_id, AppointmentStatus::Cancelled, None)
    }

    pub fn complete(
        &self,
        appointment_id: &Uuid,
        diagnosis: Option<&str>,
    ) -> Result<Appointment, TriageError> {
        self.store
            .update_appointment_status(appointment_id, AppointmentStatus::Completed, diagnosis)
    }

    fn check_slot(&self, ts: &NaiveDateTime) -> Result<(), TriageError> {
        let grid = self.availability.grid();
        if grid.contains(ts) {
            Ok(())
        } else {
            Err(TriageError::InvalidInput(format!(
                "appointments start on the hour between {:02}:00 and {:02}:00",
                grid.start_hour, grid.end_hour
            )))
        }
    }
}

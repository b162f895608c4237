//! Persistence seam for the scheduler.
//!
//! `AppointmentStore` is what the core sees; `SqliteAppointmentStore` is the
//! one implementation, a single connection behind a `Mutex`. Double booking
//! is prevented by the open-slot UNIQUE index, so the insert itself is the
//! check, across threads and across processes sharing the file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{
    Appointment, AppointmentStatus, Doctor, NewPatient, Patient, PatientCondition, PatientHistory,
    PatientMedication,
};
use crate::routing::TriageError;

pub trait AppointmentStore: Send + Sync {
    /// Look a patient up by TC identity number.
    fn find_patient(&self, tc_number: &str) -> Result<Option<Patient>, TriageError>;

    fn register_patient(&self, new: &NewPatient) -> Result<Patient, TriageError>;

    /// Book a slot. `SlotConflict` when another scheduled appointment
    /// already holds (doctor, timestamp).
    fn create_appointment(
        &self,
        patient_id: &Uuid,
        doctor_id: &Uuid,
        scheduled_at: NaiveDateTime,
        department: &str,
        symptoms: Option<&str>,
    ) -> Result<Appointment, TriageError>;

    fn get_appointment(&self, id: &Uuid) -> Result<Option<Appointment>, TriageError>;

    /// Scheduled bookings of a doctor with `from <= scheduled_at <= to`.
    fn list_scheduled_appointments(
        &self,
        doctor_id: &Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Appointment>, TriageError>;

    /// Only `scheduled → completed` and `scheduled → cancelled` succeed.
    fn update_appointment_status(
        &self,
        id: &Uuid,
        new_status: AppointmentStatus,
        diagnosis: Option<&str>,
    ) -> Result<Appointment, TriageError>;

    fn reschedule_appointment(
        &self,
        id: &Uuid,
        new_time: NaiveDateTime,
    ) -> Result<Appointment, TriageError>;

    fn list_patient_appointments(
        &self,
        patient_id: &Uuid,
    ) -> Result<Vec<Appointment>, TriageError>;

    fn patient_history(&self, patient_id: &Uuid) -> Result<PatientHistory, TriageError>;

    /// `PatientNotFound` when `condition.patient_id` is not registered.
    fn record_condition(&self, condition: &PatientCondition) -> Result<(), TriageError>;

    /// `PatientNotFound` when `medication.patient_id` is not registered.
    fn record_medication(&self, medication: &PatientMedication) -> Result<(), TriageError>;

    /// Mirror the roster so appointments can reference doctors.
    fn sync_doctor_roster(&self, roster: &[Doctor]) -> Result<usize, TriageError>;
}

pub struct SqliteAppointmentStore {
    conn: Mutex<Connection>,
}

impl SqliteAppointmentStore {
    pub fn open(path: &Path) -> Result<Self, TriageError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, TriageError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    /// Wrap an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TriageError> {
        self.conn
            .lock()
            .map_err(|_| TriageError::from(DatabaseError::LockPoisoned))
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn find_patient(&self, tc_number: &str) -> Result<Option<Patient>, TriageError> {
        let conn = self.conn()?;
        Ok(db::get_patient_by_tc(&conn, tc_number)?)
    }

    fn register_patient(&self, new: &NewPatient) -> Result<Patient, TriageError> {
        let conn = self.conn()?;
        match db::insert_patient(&conn, new) {
            Ok(patient) => {
                tracing::info!(patient_id = %patient.id, "Patient registered");
                Ok(patient)
            }
            Err(DatabaseError::Duplicate(_)) => Err(TriageError::InvalidInput(
                "a patient with this TC number is already registered".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn create_appointment(
        &self,
        patient_id: &Uuid,
        doctor_id: &Uuid,
        scheduled_at: NaiveDateTime,
        department: &str,
        symptoms: Option<&str>,
    ) -> Result<Appointment, TriageError> {
        let conn = self.conn()?;
        if !db::patient_exists(&conn, patient_id)? {
            return Err(TriageError::PatientNotFound);
        }
        if db::get_doctor_name(&conn, doctor_id)?.is_none() {
            return Err(TriageError::DoctorNotFound);
        }

        let appt = Appointment {
            id: Uuid::new_v4(),
            patient_id: *patient_id,
            doctor_id: *doctor_id,
            department: department.to_string(),
            scheduled_at,
            status: AppointmentStatus::Scheduled,
            symptoms: symptoms.map(str::to_string),
            diagnosis: None,
        };
        match db::insert_appointment(&conn, &appt) {
            Ok(()) => {
                tracing::info!(
                    appointment_id = %appt.id,
                    doctor_id = %doctor_id,
                    department,
                    %scheduled_at,
                    "Appointment booked"
                );
                Ok(appt)
            }
            Err(e) => {
                let err = TriageError::from(e);
                if matches!(err, TriageError::SlotConflict) {
                    tracing::warn!(doctor_id = %doctor_id, %scheduled_at, "Slot already taken");
                }
                Err(err)
            }
        }
    }

    fn get_appointment(&self, id: &Uuid) -> Result<Option<Appointment>, TriageError> {
        let conn = self.conn()?;
        Ok(db::get_appointment(&conn, id)?)
    }

    fn list_scheduled_appointments(
        &self,
        doctor_id: &Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Appointment>, TriageError> {
        let conn = self.conn()?;
        Ok(db::list_scheduled_for_doctor(&conn, doctor_id, &from, &to)?)
    }

    fn update_appointment_status(
        &self,
        id: &Uuid,
        new_status: AppointmentStatus,
        diagnosis: Option<&str>,
    ) -> Result<Appointment, TriageError> {
        let conn = self.conn()?;
        let current = db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)?;
        if !current.status.can_transition_to(new_status) {
            return Err(TriageError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        // Another connection may have moved it since the read above.
        if !db::transition_appointment_status(&conn, id, current.status, new_status, diagnosis)? {
            let latest = db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)?;
            return Err(TriageError::InvalidTransition {
                from: latest.status,
                to: new_status,
            });
        }

        tracing::info!(appointment_id = %id, status = %new_status, "Appointment status changed");
        db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)
    }

    fn reschedule_appointment(
        &self,
        id: &Uuid,
        new_time: NaiveDateTime,
    ) -> Result<Appointment, TriageError> {
        let conn = self.conn()?;
        let current = db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)?;
        if current.status != AppointmentStatus::Scheduled {
            return Err(TriageError::InvalidTransition {
                from: current.status,
                to: AppointmentStatus::Scheduled,
            });
        }
        if !db::reschedule_appointment(&conn, id, &new_time)? {
            let latest = db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)?;
            return Err(TriageError::InvalidTransition {
                from: latest.status,
                to: AppointmentStatus::Scheduled,
            });
        }

        tracing::info!(appointment_id = %id, %new_time, "Appointment rescheduled");
        db::get_appointment(&conn, id)?.ok_or(TriageError::AppointmentNotFound)
    }

    fn list_patient_appointments(
        &self,
        patient_id: &Uuid,
    ) -> Result<Vec<Appointment>, TriageError> {
        let conn = self.conn()?;
        Ok(db::list_appointments_for_patient(&conn, patient_id)?)
    }

    fn patient_history(&self, patient_id: &Uuid) -> Result<PatientHistory, TriageError> {
        let conn = self.conn()?;
        Ok(PatientHistory {
            visits: db::list_department_visits(&conn, patient_id)?,
            conditions: db::list_conditions(&conn, patient_id)?,
            medications: db::list_patient_medications(&conn, patient_id)?,
        })
    }

    fn record_condition(&self, condition: &PatientCondition) -> Result<(), TriageError> {
        let conn = self.conn()?;
        if !db::patient_exists(&conn, &condition.patient_id)? {
            return Err(TriageError::PatientNotFound);
        }
        db::insert_condition(&conn, condition)?;
        tracing::info!(patient_id = %condition.patient_id, "Condition recorded");
        Ok(())
    }

    fn record_medication(&self, medication: &PatientMedication) -> Result<(), TriageError> {
        let conn = self.conn()?;
        if !db::patient_exists(&conn, &medication.patient_id)? {
            return Err(TriageError::PatientNotFound);
        }
        db::insert_patient_medication(&conn, medication)?;
        tracing::info!(
            patient_id = %medication.patient_id,
            active = medication.is_active,
            "Medication recorded"
        );
        Ok(())
    }

    fn sync_doctor_roster(&self, roster: &[Doctor]) -> Result<usize, TriageError> {
        let conn = self.conn()?;
        let written = db::sync_doctors(&conn, roster)?;
        tracing::info!(doctors = written, "Doctor roster synced");
        Ok(written)
    }
}

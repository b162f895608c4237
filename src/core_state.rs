//! Application state shared by every caller of the library.
//!
//! `CoreState` owns the immutable routing tables, the intake router and the
//! scheduler. Built once at startup and handed out behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use crate::config;
use crate::routing::{IntakeRouter, ReferenceData, SymptomReport, TriageError, TriageOutcome};
use crate::routing_config::RoutingConfig;
use crate::scheduling::{validate_tc_number, AppointmentStore, Scheduler, SqliteAppointmentStore};

pub struct CoreState {
    router: IntakeRouter,
    scheduler: Scheduler,
}

impl CoreState {
    /// Open everything under `data_dir`: routing overrides, reference
    /// tables (bundled when absent) and the appointment database.
    pub fn open(data_dir: &Path) -> Result<Self, TriageError> {
        let config = RoutingConfig::load(&data_dir.join(config::ROUTING_CONFIG_FILE))?;
        let reference = ReferenceData::load_or_bundled(&data_dir.join(config::REFERENCE_DIR))?;
        let store = SqliteAppointmentStore::open(&data_dir.join(config::DATABASE_FILE))?;
        tracing::info!(data_dir = %data_dir.display(), "Opening patient router state");
        Self::with_store(Arc::new(reference), config, Arc::new(store))
    }

    /// `open` on the default data directory.
    pub fn open_default() -> Result<Self, TriageError> {
        Self::open(&config::app_data_dir())
    }

    /// Bundled tables, default config, in-memory database.
    pub fn in_memory() -> Result<Self, TriageError> {
        Self::with_store(
            Arc::new(ReferenceData::bundled()?),
            RoutingConfig::default(),
            Arc::new(SqliteAppointmentStore::open_in_memory()?),
        )
    }

    /// Assemble from parts and mirror the roster into the store. Nothing is
    /// written when `config` is invalid.
    pub fn with_store(
        reference: Arc<ReferenceData>,
        config: RoutingConfig,
        store: Arc<dyn AppointmentStore>,
    ) -> Result<Self, TriageError> {
        let scheduler = Scheduler::new(store, Arc::clone(&reference), &config);
        let router = IntakeRouter::new(reference, config)?;
        scheduler.sync_roster()?;
        Ok(Self { router, scheduler })
    }

    pub fn router(&self) -> &IntakeRouter {
        &self.router
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Triage a report, biased by the history of `tc_number` when that
    /// patient is registered. Unknown patients are triaged without history.
    pub fn intake(
        &self,
        report: &SymptomReport,
        tc_number: Option<&str>,
    ) -> Result<TriageOutcome, TriageError> {
        let history = match tc_number {
            Some(tc) => {
                validate_tc_number(tc)?;
                match self.scheduler.store().find_patient(tc)? {
                    Some(patient) => Some(self.scheduler.store().patient_history(&patient.id)?),
                    None => {
                        tracing::debug!("Patient not registered, triaging without history");
                        None
                    }
                }
            }
            None => None,
        };
        self.router.triage(report, history.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::NewPatient;
    use crate::routing::orchestrator::BRING_MEDICATIONS_NOTE;
    use crate::routing::reference::doctor_id;

    const TC: &str = "12345678901";

    fn register(state: &CoreState) {
        state
            .scheduler()
            .register_patient(&NewPatient {
                tc_number: TC.into(),
                name: "Ayse Yilmaz".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 12).unwrap(),
                phone: "+90 555 000 0000".into(),
                email: "ayse@example.com".into(),
            })
            .unwrap();
    }

    #[test]
    fn intake_without_patient() {
        let state = CoreState::in_memory().unwrap();
        let outcome = state
            .intake(&SymptomReport::free_text("eye pain and blurred vision"), None)
            .unwrap();
        assert_eq!(outcome.recommendations[0].department, "ophthalmology");
    }

    #[test]
    fn unknown_patient_triaged_without_history() {
        let state = CoreState::in_memory().unwrap();
        let outcome = state
            .intake(&SymptomReport::free_text("cough"), Some("10987654321"))
            .unwrap();
        assert!(outcome.patient_notes.is_empty());
    }

    #[test]
    fn malformed_tc_rejected() {
        let state = CoreState::in_memory().unwrap();
        assert!(matches!(
            state.intake(&SymptomReport::free_text("cough"), Some("12ab")),
            Err(TriageError::InvalidInput(_))
        ));
    }

    #[test]
    fn past_visit_biases_intake() {
        let state = CoreState::in_memory().unwrap();
        register(&state);
        let wilson = doctor_id("Dr. James Wilson");
        let at = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let appt = state
            .scheduler()
            .book(TC, &wilson, "internal_medicine", at, Some("fever"))
            .unwrap();
        state.scheduler().complete(&appt.id, Some("Seasonal flu")).unwrap();

        let plain = state
            .intake(&SymptomReport::free_text("thyroid and fever"), None)
            .unwrap();
        let biased = state
            .intake(&SymptomReport::free_text("thyroid and fever"), Some(TC))
            .unwrap();
        let score = |o: &TriageOutcome| {
            o.recommendations
                .iter()
                .find(|r| r.department == "internal_medicine")
                .map(|r| r.confidence)
                .unwrap()
        };
        assert!(score(&biased) > score(&plain));
    }

    #[test]
    fn recorded_background_reaches_intake_notes() {
        let state = CoreState::in_memory().unwrap();
        register(&state);
        let scheduler = state.scheduler();
        scheduler.record_medication(TC, "Beloc", "50mg", "once daily", true).unwrap();
        scheduler.record_medication(TC, "Majezik", "100mg", "when needed", false).unwrap();
        scheduler.record_condition(TC, "Hypertension", None, None).unwrap();

        let outcome = state
            .intake(&SymptomReport::free_text("chest pain"), Some(TC))
            .unwrap();
        assert_eq!(
            outcome.patient_notes,
            vec![
                "Please inform the doctor about your current medications: Beloc (50mg)".to_string(),
                "Please inform the doctor about your chronic conditions: Hypertension".to_string(),
            ]
        );
        assert_eq!(outcome.preparation_notes[0], BRING_MEDICATIONS_NOTE);
    }

    #[test]
    fn invalid_config_writes_no_roster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::DATABASE_FILE);
        let store = Arc::new(SqliteAppointmentStore::open(&path).unwrap());
        let bad = RoutingConfig {
            top_k: 0,
            ..RoutingConfig::default()
        };
        let result = CoreState::with_store(Arc::new(ReferenceData::bundled().unwrap()), bad, store);
        assert!(matches!(result, Err(TriageError::Configuration(_))));

        let conn = crate::db::open_database(&path).unwrap();
        assert_eq!(crate::db::count_doctors(&conn).unwrap(), 0);
    }

    #[test]
    fn open_creates_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::open(dir.path()).unwrap();
        assert!(dir.path().join(config::DATABASE_FILE).exists());
        register(&state);
        drop(state);

        // Reopening keeps the registration.
        let state = CoreState::open(dir.path()).unwrap();
        assert!(state.scheduler().find_patient(TC).is_ok());
    }
}

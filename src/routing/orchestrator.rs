use std::sync::Arc;

use super::keywords::KeywordMatcher;
use super::ranker::DepartmentRanker;
use super::recommender::DoctorRecommender;
use super::reference::ReferenceData;
use super::types::{
    DepartmentRecommendation, DepartmentScore, KeywordMatch, SymptomReport, TriageError,
    TriageOutcome,
};
use crate::models::PatientHistory;
use crate::routing_config::RoutingConfig;

pub const GENERAL_ASSESSMENT_REASON: &str = "Based on general assessment and department expertise";
pub const BRING_MEDICATIONS_NOTE: &str = "Please bring your current medications with you";

/// Runs one report through matcher → ranker → recommender.
///
/// Holds only immutable tables, so one router can serve many threads.
pub struct IntakeRouter {
    reference: Arc<ReferenceData>,
    config: RoutingConfig,
    matcher: KeywordMatcher,
    ranker: DepartmentRanker,
    recommender: DoctorRecommender,
}

impl IntakeRouter {
    pub fn new(reference: Arc<ReferenceData>, config: RoutingConfig) -> Result<Self, TriageError> {
        config.validate()?;
        Ok(Self {
            matcher: KeywordMatcher::new(Arc::clone(&reference)),
            ranker: DepartmentRanker::new(Arc::clone(&reference), &config),
            recommender: DoctorRecommender::new(Arc::clone(&reference), &config),
            reference,
            config,
        })
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    pub fn ranker(&self) -> &DepartmentRanker {
        &self.ranker
    }

    pub fn recommender(&self) -> &DoctorRecommender {
        &self.recommender
    }

    pub fn triage(
        &self,
        report: &SymptomReport,
        history: Option<&PatientHistory>,
    ) -> Result<TriageOutcome, TriageError> {
        report.validate(self.config.max_symptom_chars)?;
        let text = report.combined_text();
        let matched = self.matcher.match_report(report);

        // Keyword hits narrow the field; with none, fall back to whatever
        // TF-IDF finds at all.
        let scores: Vec<DepartmentScore> = if matched.fallback {
            self.ranker
                .rank(&text, history)
                .into_iter()
                .filter(|s| s.score > 0.0)
                .collect()
        } else {
            self.ranker.rank_among(&text, &matched.departments, history)?
        };

        let recommendations: Vec<DepartmentRecommendation> = scores
            .iter()
            .map(|s| DepartmentRecommendation {
                department: s.department.clone(),
                display_name: self.reference.display_name(&s.department).to_string(),
                confidence: s.score,
                reason: self.reason(&s.department, &matched),
            })
            .collect();

        let tags: Vec<String> = recommendations.iter().map(|r| r.department.clone()).collect();
        let doctors = if tags.is_empty() {
            Vec::new()
        } else {
            match self.recommender.recommend(&tags, Some(matched.priority)) {
                Ok(doctors) => doctors,
                Err(TriageError::EmptyCandidateSet) => {
                    tracing::warn!(
                        departments = tags.len(),
                        "No doctors for recommended departments"
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            }
        };

        let outcome = TriageOutcome {
            priority: matched.priority,
            preparation_notes: self.preparation_notes(&tags, history),
            patient_notes: history.map(patient_notes).unwrap_or_default(),
            recommendations,
            candidate_departments: matched.departments,
            matched_symptoms: matched.matched_symptoms,
            initial_treatments: matched.initial_treatments,
            warnings: matched.warnings,
            doctors,
        };

        tracing::info!(
            priority = %outcome.priority,
            fallback = matched.fallback,
            departments = outcome.recommendations.len(),
            doctors = outcome.doctors.len(),
            warnings = outcome.warnings.len(),
            "Triage complete"
        );
        Ok(outcome)
    }

    fn reason(&self, department: &str, matched: &KeywordMatch) -> String {
        if matched.fallback {
            return GENERAL_ASSESSMENT_REASON.to_string();
        }
        let symptoms: Vec<&str> = self
            .reference
            .symptoms
            .iter()
            .filter(|rule| matched.matched_symptoms.contains(&rule.key))
            .filter(|rule| rule.departments.iter().any(|d| d == department))
            .map(|rule| rule.key.as_str())
            .collect();
        if symptoms.is_empty() {
            GENERAL_ASSESSMENT_REASON.to_string()
        } else {
            format!("Based on symptoms: {}", symptoms.join(", "))
        }
    }

    fn preparation_notes(
        &self,
        departments: &[String],
        history: Option<&PatientHistory>,
    ) -> Vec<String> {
        let mut notes: Vec<String> = Vec::new();
        if history.is_some_and(|h| h.active_medications().next().is_some()) {
            notes.push(BRING_MEDICATIONS_NOTE.to_string());
        }
        for tag in departments {
            if let Some(profile) = self.reference.department(tag) {
                for note in &profile.preparation_notes {
                    if !notes.contains(note) {
                        notes.push(note.clone());
                    }
                }
            }
        }
        notes
    }
}

/// Reminders built from the patient's recorded background.
fn patient_notes(history: &PatientHistory) -> Vec<String> {
    let mut notes = Vec::new();
    let meds: Vec<String> = history
        .active_medications()
        .map(|m| format!("{} ({})", m.name, m.dosage))
        .collect();
    if !meds.is_empty() {
        notes.push(format!(
            "Please inform the doctor about your current medications: {}",
            meds.join(", ")
        ));
    }
    if !history.conditions.is_empty() {
        let conditions: Vec<&str> = history
            .conditions
            .iter()
            .map(|c| c.condition.as_str())
            .collect();
        notes.push(format!(
            "Please inform the doctor about your chronic conditions: {}",
            conditions.join(", ")
        ));
    }
    notes
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::{
        AppointmentStatus, DepartmentVisit, PatientCondition, PatientMedication, PriorityLevel,
        Severity,
    };
    use crate::routing::keywords::NO_MATCH_WARNING;
    use crate::routing::types::StructuredSymptoms;

    fn router() -> IntakeRouter {
        IntakeRouter::new(
            Arc::new(ReferenceData::bundled().unwrap()),
            RoutingConfig::default(),
        )
        .unwrap()
    }

    fn history() -> PatientHistory {
        let patient_id = Uuid::new_v4();
        PatientHistory {
            visits: vec![DepartmentVisit {
                department: "internal_medicine".into(),
                scheduled_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                doctor_name: "Dr. James Wilson".into(),
                status: AppointmentStatus::Completed,
                diagnosis: Some("Seasonal flu".into()),
            }],
            conditions: vec![
                PatientCondition {
                    id: Uuid::new_v4(),
                    patient_id,
                    condition: "Migraine".into(),
                    diagnosed_on: None,
                    notes: None,
                },
                PatientCondition {
                    id: Uuid::new_v4(),
                    patient_id,
                    condition: "Hypertension".into(),
                    diagnosed_on: None,
                    notes: None,
                },
            ],
            medications: vec![
                PatientMedication {
                    id: Uuid::new_v4(),
                    patient_id,
                    name: "Beloc".into(),
                    dosage: "50mg".into(),
                    frequency: "once daily".into(),
                    is_active: true,
                },
                PatientMedication {
                    id: Uuid::new_v4(),
                    patient_id,
                    name: "Majezik".into(),
                    dosage: "100mg".into(),
                    frequency: "when needed".into(),
                    is_active: false,
                },
            ],
        }
    }

    #[test]
    fn chest_pain_routes_to_cardiology_with_doctors() {
        let outcome = router()
            .triage(&SymptomReport::free_text("severe chest pain and shortness of breath"), None)
            .unwrap();
        assert_eq!(outcome.priority, PriorityLevel::High);
        assert_eq!(outcome.recommendations[0].department, "cardiology");
        assert_eq!(outcome.recommendations[0].display_name, "Cardiology");
        assert!(outcome.recommendations[0]
            .reason
            .starts_with("Based on symptoms: chest pain"));
        assert!(!outcome.doctors.is_empty() && outcome.doctors.len() <= 3);
        assert!(outcome
            .preparation_notes
            .contains(&"Avoid heavy meals before the appointment".to_string()));
        assert!(outcome.patient_notes.is_empty());
    }

    #[test]
    fn recommendations_stay_within_matched_departments() {
        let outcome = router()
            .triage(&SymptomReport::free_text("I have a rash"), None)
            .unwrap();
        assert_eq!(outcome.candidate_departments, vec!["dermatology"]);
        assert_eq!(outcome.recommendations.len(), 1);
        assert_eq!(outcome.recommendations[0].department, "dermatology");
        assert!(outcome.doctors.iter().all(|d| d.doctor.department == "dermatology"));
    }

    #[test]
    fn empty_input_uses_fallback() {
        let outcome = router().triage(&SymptomReport::free_text(""), None).unwrap();
        assert_eq!(
            outcome.candidate_departments,
            ReferenceData::bundled().unwrap().department_tags()
        );
        assert!(outcome.warnings.contains(&NO_MATCH_WARNING.to_string()));
        // Nothing to score either, so no department is singled out.
        assert!(outcome.recommendations.is_empty());
        assert!(outcome.doctors.is_empty());
    }

    #[test]
    fn fallback_uses_tfidf_when_text_has_department_words() {
        let outcome = router()
            .triage(&SymptomReport::free_text("worried about my thyroid"), None)
            .unwrap();
        assert!(outcome.matched_symptoms.is_empty());
        assert_eq!(outcome.recommendations[0].department, "endocrinology");
        assert_eq!(outcome.recommendations[0].reason, GENERAL_ASSESSMENT_REASON);
        assert_eq!(outcome.doctors[0].doctor.department, "endocrinology");
    }

    #[test]
    fn history_adds_notes_and_bias() {
        let h = history();
        let outcome = router()
            .triage(&SymptomReport::free_text("fever and cough"), Some(&h))
            .unwrap();
        assert_eq!(outcome.recommendations[0].department, "internal_medicine");
        assert!(outcome.recommendations[0].confidence <= 1.0);
        assert_eq!(
            outcome.patient_notes,
            vec![
                "Please inform the doctor about your current medications: Beloc (50mg)".to_string(),
                "Please inform the doctor about your chronic conditions: Migraine, Hypertension"
                    .to_string(),
            ]
        );
        assert_eq!(outcome.preparation_notes[0], BRING_MEDICATIONS_NOTE);
    }

    #[test]
    fn structured_report_priority_and_validation() {
        let r = router();
        let report = SymptomReport::Structured(StructuredSymptoms {
            primary: vec!["headache".into()],
            secondary: vec!["dizziness".into()],
            duration: Some("3 days".into()),
            severity: Severity::Moderate,
        });
        let outcome = r.triage(&report, None).unwrap();
        assert_eq!(outcome.priority, PriorityLevel::Medium);
        assert_eq!(outcome.recommendations[0].department, "neurology");
        assert!(outcome
            .preparation_notes
            .contains(&"Bring any previous MRI/CT scan results".to_string()));

        let empty = SymptomReport::Structured(StructuredSymptoms {
            primary: vec![],
            secondary: vec!["cough".into()],
            duration: None,
            severity: Severity::Low,
        });
        assert!(matches!(r.triage(&empty, None), Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn overlong_text_rejected() {
        let text = "cough ".repeat(1000);
        assert!(matches!(
            router().triage(&SymptomReport::free_text(text), None),
            Err(TriageError::InvalidInput(_))
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = RoutingConfig {
            top_k: 0,
            ..RoutingConfig::default()
        };
        assert!(IntakeRouter::new(Arc::new(ReferenceData::bundled().unwrap()), config).is_err());
    }

    #[test]
    fn router_is_shareable_across_threads() {
        let r = Arc::new(router());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || {
                    r.triage(&SymptomReport::free_text("back pain and numbness"), None)
                        .unwrap()
                        .recommendations
                        .into_iter()
                        .map(|d| d.department)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}

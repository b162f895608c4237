use std::cmp::Ordering;
use std::sync::Arc;

use super::reference::ReferenceData;
use super::types::{RankedDoctor, TriageError};
use crate::models::{Doctor, PriorityLevel};
use crate::routing_config::RoutingConfig;

/// Ranks doctors of the recommended departments by
/// `(experience × w_exp + rating × w_rating) × priority multiplier`.
pub struct DoctorRecommender {
    reference: Arc<ReferenceData>,
    config: RoutingConfig,
}

impl DoctorRecommender {
    pub fn new(reference: Arc<ReferenceData>, config: &RoutingConfig) -> Self {
        Self {
            reference,
            config: config.clone(),
        }
    }

    pub fn score(&self, doctor: &Doctor, priority: Option<PriorityLevel>) -> f64 {
        let base = doctor.experience_years as f64 * self.config.experience_weight
            + doctor.rating * self.config.rating_weight;
        base * self.config.priority_multiplier(priority)
    }

    /// Candidates from every department in input order. A doctor listed
    /// under two requested departments is scored twice; ties keep
    /// gathering order.
    pub fn recommend(
        &self,
        departments: &[String],
        priority: Option<PriorityLevel>,
    ) -> Result<Vec<RankedDoctor>, TriageError> {
        let mut candidates = Vec::new();
        for department in departments {
            if !self.reference.is_known_department(department) {
                return Err(TriageError::InvalidDepartment(department.clone()));
            }
            candidates.extend(self.reference.doctors_in(department).map(|d| RankedDoctor {
                doctor: d.clone(),
                score: self.score(d, priority),
            }));
        }
        if candidates.is_empty() {
            return Err(TriageError::EmptyCandidateSet);
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        candidates.truncate(self.config.top_k);
        Ok(candidates)
    }
}

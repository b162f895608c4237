use std::collections::HashSet;
use std::sync::Arc;

use super::reference::ReferenceData;
use super::types::{KeywordMatch, SymptomReport};
use crate::models::{PriorityLevel, Severity};

pub const NO_MATCH_WARNING: &str =
    "No specific match found for your symptoms. Please select the most appropriate department.";

fn severity_warning(symptom: &str, indicator: &str) -> String {
    format!(
        "The combination of '{symptom}' with '{indicator}' may be serious. \
         Please seek medical attention promptly."
    )
}

/// Substring matcher from symptom text to department tags.
///
/// Pure: the same text against the same tables always yields the same match.
pub struct KeywordMatcher {
    reference: Arc<ReferenceData>,
}

impl KeywordMatcher {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    /// Match free text with no stated severity.
    pub fn match_text(&self, text: &str) -> KeywordMatch {
        self.evaluate(text, None)
    }

    pub fn match_report(&self, report: &SymptomReport) -> KeywordMatch {
        self.evaluate(&report.combined_text(), report.severity())
    }

    fn evaluate(&self, text: &str, severity: Option<Severity>) -> KeywordMatch {
        let text = text.to_lowercase();
        let mut hit_departments: HashSet<&str> = HashSet::new();
        let mut matched_symptoms = Vec::new();
        let mut initial_treatments = Vec::new();
        let mut warnings = Vec::new();

        for rule in &self.reference.symptoms {
            if !rule.aliases.iter().any(|a| !a.is_empty() && text.contains(a.as_str())) {
                continue;
            }
            hit_departments.extend(rule.departments.iter().map(String::as_str));
            matched_symptoms.push(rule.key.clone());
            initial_treatments.push(rule.initial_treatment.clone());

            for indicator in &rule.severity_check {
                if !indicator.is_empty() && text.contains(indicator.as_str()) {
                    warnings.push(severity_warning(&rule.key, indicator));
                }
            }
        }

        let fallback = matched_symptoms.is_empty();
        let departments = if fallback {
            warnings.push(NO_MATCH_WARNING.to_string());
            self.reference.department_tags()
        } else {
            self.reference
                .departments
                .iter()
                .filter(|d| hit_departments.contains(d.tag.as_str()))
                .map(|d| d.tag.clone())
                .collect()
        };

        KeywordMatch {
            departments,
            matched_symptoms,
            initial_treatments,
            warnings,
            priority: self.priority(&text, severity),
            fallback,
        }
    }

    /// `severe` or any urgent keyword → high, `moderate` → medium, else low.
    fn priority(&self, lowered: &str, severity: Option<Severity>) -> PriorityLevel {
        let urgent = self
            .reference
            .urgent_keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.as_str()));
        match severity {
            Some(Severity::Severe) => PriorityLevel::High,
            _ if urgent => PriorityLevel::High,
            Some(Severity::Moderate) => PriorityLevel::Medium,
            _ => PriorityLevel::Low,
        }
    }
}

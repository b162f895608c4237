//! Tunable weights and thresholds for intake routing.
//!
//! Every field has a default, so a partial `routing.json` only overrides
//! what it names. A missing file means all defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::PriorityLevel;
use crate::routing::TriageError;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Score multipliers applied per urgency level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityMultipliers {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for PriorityMultipliers {
    fn default() -> Self {
        Self {
            high: 1.5,
            medium: 1.2,
            low: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Doctor score weight per year of experience.
    pub experience_weight: f64,
    /// Doctor score weight per rating point (0–5).
    pub rating_weight: f64,
    pub priority_multipliers: PriorityMultipliers,
    /// Factor applied to departments the patient has visited before.
    pub history_bonus: f64,
    /// Length of department and doctor shortlists.
    pub top_k: usize,
    /// First bookable hour of the day (inclusive).
    pub slot_start_hour: u32,
    /// Last bookable hour of the day (exclusive).
    pub slot_end_hour: u32,
    pub default_window_days: u32,
    /// Widest availability window a caller may request.
    pub max_window_days: u32,
    /// Longest free-text symptom description accepted.
    pub max_symptom_chars: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            experience_weight: 0.4,
            rating_weight: 0.6,
            priority_multipliers: PriorityMultipliers::default(),
            history_bonus: 1.2,
            top_k: 3,
            slot_start_hour: 9,
            slot_end_hour: 17,
            default_window_days: 7,
            max_window_days: 90,
            max_symptom_chars: 4000,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl RoutingConfig {
    /// Read overrides from `path`. Missing file → defaults.
    pub fn load(path: &Path) -> Result<Self, TriageError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No routing config, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| TriageError::Configuration(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| TriageError::Configuration(format!("{}: {e}", path.display())))?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded routing config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TriageError> {
        if self.slot_start_hour >= self.slot_end_hour || self.slot_end_hour > 24 {
            return Err(TriageError::Configuration(format!(
                "slot hours must satisfy start < end <= 24 (got {}..{})",
                self.slot_start_hour, self.slot_end_hour
            )));
        }
        if self.default_window_days > self.max_window_days {
            return Err(TriageError::Configuration(format!(
                "default_window_days ({}) exceeds max_window_days ({})",
                self.default_window_days, self.max_window_days
            )));
        }
        if self.top_k == 0 {
            return Err(TriageError::Configuration("top_k must be at least 1".into()));
        }
        let m = &self.priority_multipliers;
        let weights = [
            self.experience_weight,
            self.rating_weight,
            self.history_bonus,
            m.high,
            m.medium,
            m.low,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(TriageError::Configuration(
                "weights and multipliers must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Missing priority scores like `low`.
    pub fn priority_multiplier(&self, priority: Option<PriorityLevel>) -> f64 {
        match priority {
            Some(PriorityLevel::High) => self.priority_multipliers.high,
            Some(PriorityLevel::Medium) => self.priority_multipliers.medium,
            Some(PriorityLevel::Low) | None => self.priority_multipliers.low,
        }
    }
}

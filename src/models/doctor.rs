use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor as seen from one department. A doctor serving two departments
/// appears twice in the roster with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub experience_years: u32,
    /// 0.0 – 5.0
    pub rating: f64,
}

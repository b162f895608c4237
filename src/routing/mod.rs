//! Intake routing: symptom text → departments → doctors.
//!
//! Pure computation over the static `ReferenceData` tables. Nothing in this
//! module touches the database.

pub mod keywords;
pub mod orchestrator;
pub mod ranker;
pub mod recommender;
pub mod reference;
pub mod types;

pub use keywords::KeywordMatcher;
pub use orchestrator::IntakeRouter;
pub use ranker::{DepartmentRanker, TfidfVectorizer};
pub use recommender::DoctorRecommender;
pub use reference::{DepartmentProfile, ReferenceData, SymptomRule};
pub use types::*;

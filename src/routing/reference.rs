use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::TriageError;
use crate::models::Doctor;

pub const DEPARTMENTS_FILE: &str = "departments.json";
pub const SYMPTOMS_FILE: &str = "symptoms.json";
pub const DOCTORS_FILE: &str = "doctors.json";

/// Department tag plus the keyword bag used for TF-IDF scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentProfile {
    pub tag: String,
    pub display_name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub preparation_notes: Vec<String>,
}

/// One recognisable symptom: the phrases that signal it, where it routes,
/// first-aid text and the companion signs that warrant a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRule {
    pub key: String,
    pub aliases: Vec<String>,
    pub departments: Vec<String>,
    pub initial_treatment: String,
    #[serde(default)]
    pub severity_check: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SymptomTable {
    urgent_keywords: Vec<String>,
    symptoms: Vec<SymptomRule>,
}

/// Roster file entry; expanded into one `Doctor` per department.
#[derive(Debug, Deserialize)]
struct RosterEntry {
    name: String,
    departments: Vec<String>,
    experience_years: u32,
    rating: f64,
}

/// Static routing tables. Built once at startup, shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub departments: Vec<DepartmentProfile>,
    pub symptoms: Vec<SymptomRule>,
    pub urgent_keywords: Vec<String>,
    /// One entry per (doctor, department), roster order.
    pub doctors: Vec<Doctor>,
}

impl ReferenceData {
    /// Tables compiled into the binary.
    pub fn bundled() -> Result<Self, TriageError> {
        Self::from_json(
            include_str!("../../resources/reference/departments.json"),
            include_str!("../../resources/reference/symptoms.json"),
            include_str!("../../resources/reference/doctors.json"),
        )
    }

    /// Load the three JSON tables from `dir`.
    pub fn load(dir: &Path) -> Result<Self, TriageError> {
        let read = |file: &str| {
            let path = dir.join(file);
            std::fs::read_to_string(&path)
                .map_err(|e| TriageError::ReferenceData(path.display().to_string(), e.to_string()))
        };
        let data = Self::from_json(
            &read(DEPARTMENTS_FILE)?,
            &read(SYMPTOMS_FILE)?,
            &read(DOCTORS_FILE)?,
        )?;
        tracing::info!(
            dir = %dir.display(),
            departments = data.departments.len(),
            symptoms = data.symptoms.len(),
            doctors = data.doctors.len(),
            "Loaded reference data"
        );
        Ok(data)
    }

    /// `load(dir)` when the directory holds a department table, bundled
    /// tables otherwise.
    pub fn load_or_bundled(dir: &Path) -> Result<Self, TriageError> {
        if dir.join(DEPARTMENTS_FILE).exists() {
            Self::load(dir)
        } else {
            Self::bundled()
        }
    }

    pub fn from_json(
        departments: &str,
        symptoms: &str,
        doctors: &str,
    ) -> Result<Self, TriageError> {
        let departments: Vec<DepartmentProfile> = serde_json::from_str(departments)
            .map_err(|e| TriageError::ReferenceData(DEPARTMENTS_FILE.into(), e.to_string()))?;
        let table: SymptomTable = serde_json::from_str(symptoms)
            .map_err(|e| TriageError::ReferenceData(SYMPTOMS_FILE.into(), e.to_string()))?;
        let roster: Vec<RosterEntry> = serde_json::from_str(doctors)
            .map_err(|e| TriageError::ReferenceData(DOCTORS_FILE.into(), e.to_string()))?;

        let doctors = roster
            .into_iter()
            .flat_map(|entry| {
                let id = doctor_id(&entry.name);
                entry.departments.into_iter().map(move |department| Doctor {
                    id,
                    name: entry.name.clone(),
                    department,
                    experience_years: entry.experience_years,
                    rating: entry.rating,
                })
            })
            .collect();

        Self::new(departments, table.symptoms, table.urgent_keywords, doctors)
    }

    /// Normalise matching phrases to lowercase and validate cross references.
    pub fn new(
        mut departments: Vec<DepartmentProfile>,
        mut symptoms: Vec<SymptomRule>,
        urgent_keywords: Vec<String>,
        doctors: Vec<Doctor>,
    ) -> Result<Self, TriageError> {
        for d in &mut departments {
            lowercase_all(&mut d.keywords);
        }
        for s in &mut symptoms {
            s.key = s.key.to_lowercase();
            lowercase_all(&mut s.aliases);
            lowercase_all(&mut s.severity_check);
        }
        let mut urgent_keywords = urgent_keywords;
        lowercase_all(&mut urgent_keywords);

        let data = Self {
            departments,
            symptoms,
            urgent_keywords,
            doctors,
        };
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<(), TriageError> {
        let invalid = |file: &str, msg: String| TriageError::ReferenceData(file.into(), msg);

        if self.departments.is_empty() {
            return Err(invalid(DEPARTMENTS_FILE, "no departments defined".into()));
        }
        let mut tags = HashSet::new();
        for d in &self.departments {
            if d.tag.trim().is_empty() {
                return Err(invalid(DEPARTMENTS_FILE, "empty department tag".into()));
            }
            if !tags.insert(d.tag.as_str()) {
                return Err(invalid(DEPARTMENTS_FILE, format!("duplicate department '{}'", d.tag)));
            }
            if d.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(invalid(
                    DEPARTMENTS_FILE,
                    format!("department '{}' has no keywords", d.tag),
                ));
            }
        }

        for s in &self.symptoms {
            if s.aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(invalid(SYMPTOMS_FILE, format!("symptom '{}' has no aliases", s.key)));
            }
            if s.departments.is_empty() {
                return Err(invalid(SYMPTOMS_FILE, format!("symptom '{}' routes nowhere", s.key)));
            }
            if let Some(unknown) = s.departments.iter().find(|d| !tags.contains(d.as_str())) {
                return Err(invalid(
                    SYMPTOMS_FILE,
                    format!("symptom '{}' routes to unknown department '{unknown}'", s.key),
                ));
            }
        }

        for d in &self.doctors {
            if d.name.trim().is_empty() {
                return Err(invalid(DOCTORS_FILE, "doctor without a name".into()));
            }
            if !tags.contains(d.department.as_str()) {
                return Err(invalid(
                    DOCTORS_FILE,
                    format!("{} listed under unknown department '{}'", d.name, d.department),
                ));
            }
            if !(0.0..=5.0).contains(&d.rating) {
                return Err(invalid(
                    DOCTORS_FILE,
                    format!("{} has rating {} outside 0-5", d.name, d.rating),
                ));
            }
        }
        Ok(())
    }

    pub fn department(&self, tag: &str) -> Option<&DepartmentProfile> {
        self.departments.iter().find(|d| d.tag == tag)
    }

    pub fn is_known_department(&self, tag: &str) -> bool {
        self.department(tag).is_some()
    }

    /// Every department tag in table order.
    pub fn department_tags(&self) -> Vec<String> {
        self.departments.iter().map(|d| d.tag.clone()).collect()
    }

    pub fn display_name<'a>(&'a self, tag: &'a str) -> &'a str {
        self.department(tag).map(|d| d.display_name.as_str()).unwrap_or(tag)
    }

    pub fn doctors_in<'a>(&'a self, department: &'a str) -> impl Iterator<Item = &'a Doctor> + 'a {
        self.doctors.iter().filter(move |d| d.department == department)
    }

    /// The roster entry for `id` under `department`, if that doctor serves it.
    pub fn doctor_in(&self, id: &Uuid, department: &str) -> Option<&Doctor> {
        self.doctors
            .iter()
            .find(|d| d.id == *id && d.department == department)
    }
}

/// Stable id derived from the doctor's name, shared across departments.
pub fn doctor_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn lowercase_all(values: &mut [String]) {
    for v in values.iter_mut() {
        *v = v.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_load_and_validate() {
        let data = ReferenceData::bundled().unwrap();
        assert_eq!(data.departments.len(), 11);
        assert_eq!(data.symptoms.len(), 19);
        assert!(data.urgent_keywords.contains(&"emergency".to_string()));
        assert!(data.is_known_department("cardiology"));
        assert_eq!(data.display_name("ent"), "ENT");
    }

    #[test]
    fn multi_department_doctor_shares_one_id() {
        let data = ReferenceData::bundled().unwrap();
        let entries: Vec<_> = data
            .doctors
            .iter()
            .filter(|d| d.name == "Dr. James Wilson")
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, entries[1].id);
        assert_eq!(entries[0].id, doctor_id("Dr. James Wilson"));
        assert!(data.doctor_in(&entries[0].id, "cardiology").is_some());
        assert!(data.doctor_in(&entries[0].id, "dermatology").is_none());
    }

    #[test]
    fn every_department_has_doctors() {
        let data = ReferenceData::bundled().unwrap();
        for tag in data.department_tags() {
            assert!(data.doctors_in(&tag).count() > 0, "{tag} has no doctors");
        }
    }

    #[test]
    fn unknown_symptom_department_rejected() {
        let departments = r#"[{"tag": "cardiology", "display_name": "Cardiology", "keywords": ["heart"]}]"#;
        let symptoms = r#"{"urgent_keywords": [], "symptoms": [
            {"key": "rash", "aliases": ["rash"], "departments": ["dermatology"], "initial_treatment": "x"}
        ]}"#;
        let err = ReferenceData::from_json(departments, symptoms, "[]").unwrap_err();
        assert!(matches!(err, TriageError::ReferenceData(ref f, _) if f == SYMPTOMS_FILE));
    }

    #[test]
    fn rating_out_of_range_rejected() {
        let departments = r#"[{"tag": "cardiology", "display_name": "Cardiology", "keywords": ["heart"]}]"#;
        let symptoms = r#"{"urgent_keywords": [], "symptoms": []}"#;
        let doctors = r#"[{"name": "Dr. X", "departments": ["cardiology"], "experience_years": 3, "rating": 5.5}]"#;
        assert!(ReferenceData::from_json(departments, symptoms, doctors).is_err());
    }

    #[test]
    fn duplicate_department_rejected() {
        let departments = r#"[
            {"tag": "ent", "display_name": "ENT", "keywords": ["ear"]},
            {"tag": "ent", "display_name": "ENT", "keywords": ["nose"]}
        ]"#;
        let symptoms = r#"{"urgent_keywords": [], "symptoms": []}"#;
        assert!(ReferenceData::from_json(departments, symptoms, "[]").is_err());
    }

    #[test]
    fn phrases_are_lowercased() {
        let departments = r#"[{"tag": "cardiology", "display_name": "Cardiology", "keywords": ["Heart"]}]"#;
        let symptoms = r#"{"urgent_keywords": ["EMERGENCY"], "symptoms": [
            {"key": "Chest Pain", "aliases": ["Chest Pain"], "departments": ["cardiology"],
             "initial_treatment": "x", "severity_check": ["Sweating"]}
        ]}"#;
        let data = ReferenceData::from_json(departments, symptoms, "[]").unwrap();
        assert_eq!(data.departments[0].keywords, vec!["heart"]);
        assert_eq!(data.symptoms[0].key, "chest pain");
        assert_eq!(data.symptoms[0].severity_check, vec!["sweating"]);
        assert_eq!(data.urgent_keywords, vec!["emergency"]);
    }

    #[test]
    fn load_from_directory_and_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ReferenceData::load(dir.path()),
            Err(TriageError::ReferenceData(_, _))
        ));
        // Without a department table the bundled copy is used.
        assert!(ReferenceData::load_or_bundled(dir.path()).is_ok());

        std::fs::write(
            dir.path().join(DEPARTMENTS_FILE),
            r#"[{"tag": "ent", "display_name": "ENT", "keywords": ["ear"]}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(SYMPTOMS_FILE),
            r#"{"urgent_keywords": [], "symptoms": []}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(DOCTORS_FILE),
            r#"[{"name": "Dr. John Smith", "departments": ["ent"], "experience_years": 15, "rating": 4.7}]"#,
        )
        .unwrap();
        let data = ReferenceData::load_or_bundled(dir.path()).unwrap();
        assert_eq!(data.departments.len(), 1);
        assert_eq!(data.doctors.len(), 1);
    }
}

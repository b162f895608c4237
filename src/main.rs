use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use patient_router_lib::config;
use patient_router_lib::models::{NewPatient, Severity};
use patient_router_lib::routing::reference::doctor_id;
use patient_router_lib::routing::StructuredSymptoms;
use patient_router_lib::{init_tracing, CoreState, SymptomReport, TriageError};

#[derive(Parser, Debug)]
#[command(name = "patient-router")]
#[command(version, long_about = None)]
#[command(about = "Symptom intake, department routing and appointment booking")]
struct Cli {
    /// Data directory (defaults to $PATIENT_ROUTER_HOME or ~/PatientRouter)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest departments and doctors for a symptom description
    Triage {
        /// TC number of a registered patient, to use their history
        #[arg(long)]
        tc: Option<String>,
        /// low, moderate or severe; treats the text as one structured symptom
        #[arg(long)]
        severity: Option<String>,
        #[arg(required = true, value_name = "SYMPTOMS")]
        text: Vec<String>,
    },
    /// List open hourly slots for a doctor
    Slots {
        #[arg(long, value_name = "NAME")]
        doctor: String,
        /// First day of the window, YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        from: String,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Register a patient
    Register {
        #[arg(long)]
        tc: String,
        #[arg(long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        dob: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        tc: String,
        #[arg(long, value_name = "NAME")]
        doctor: String,
        #[arg(long)]
        department: String,
        /// "YYYY-MM-DD HH:MM"
        #[arg(long, value_name = "DATETIME")]
        at: String,
        #[arg(long)]
        symptoms: Option<String>,
    },
    /// Move a scheduled appointment to another slot
    Reschedule {
        #[arg(value_name = "APPOINTMENT_ID")]
        id: String,
        /// "YYYY-MM-DD HH:MM"
        #[arg(long, value_name = "DATETIME")]
        at: String,
    },
    /// Cancel a scheduled appointment
    Cancel {
        #[arg(value_name = "APPOINTMENT_ID")]
        id: String,
    },
    /// Mark a scheduled appointment as completed
    Complete {
        #[arg(value_name = "APPOINTMENT_ID")]
        id: String,
        #[arg(long)]
        diagnosis: Option<String>,
    },
    /// List every appointment of a patient
    Appointments {
        #[arg(long)]
        tc: String,
    },
    /// Record a chronic condition for a patient
    AddCondition {
        #[arg(long)]
        tc: String,
        #[arg(long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        diagnosed: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a medication a patient takes
    AddMedication {
        #[arg(long)]
        tc: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        dosage: String,
        #[arg(long, default_value = "")]
        frequency: String,
        /// Record a medication the patient no longer takes
        #[arg(long)]
        inactive: bool,
    },
    /// Show a patient's visits, conditions and medications
    History {
        #[arg(long)]
        tc: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error("Invalid {what}: {value}")]
    Parse { what: &'static str, value: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let data_dir = cli.data_dir.unwrap_or_else(config::app_data_dir);
    let state = CoreState::open(&data_dir)?;
    let scheduler = state.scheduler();

    match cli.command {
        Command::Triage { tc, severity, text } => {
            let text = text.join(" ");
            let report = match severity {
                Some(s) => SymptomReport::Structured(StructuredSymptoms {
                    primary: vec![text],
                    secondary: vec![],
                    duration: None,
                    severity: Severity::from_str(&s.to_lowercase())
                        .map_err(|_| CliError::Parse { what: "severity", value: s })?,
                }),
                None => SymptomReport::free_text(text),
            };
            to_json(&state.intake(&report, tc.as_deref())?)
        }
        Command::Slots { doctor, from, days } => {
            let start = parse_date(&from)?.and_time(chrono::NaiveTime::MIN);
            to_json(&scheduler.available_slots(&doctor_id(&doctor), start, days)?)
        }
        Command::Register { tc, name, dob, phone, email } => {
            let patient = scheduler.register_patient(&NewPatient {
                tc_number: tc,
                name,
                date_of_birth: parse_date(&dob)?,
                phone,
                email,
            })?;
            to_json(&patient)
        }
        Command::Book { tc, doctor, department, at, symptoms } => {
            let at = parse_datetime(&at)?;
            let doctor = doctor_id(&doctor);
            to_json(&scheduler.book(&tc, &doctor, &department, at, symptoms.as_deref())?)
        }
        Command::Reschedule { id, at } => {
            to_json(&scheduler.reschedule(&parse_id(&id)?, parse_datetime(&at)?)?)
        }
        Command::Cancel { id } => to_json(&scheduler.cancel(&parse_id(&id)?)?),
        Command::Complete { id, diagnosis } => {
            to_json(&scheduler.complete(&parse_id(&id)?, diagnosis.as_deref())?)
        }
        Command::Appointments { tc } => to_json(&scheduler.appointments_for(&tc)?),
        Command::History { tc } => to_json(&scheduler.patient_history(&tc)?),
        Command::AddCondition { tc, name, diagnosed, notes } => {
            let diagnosed = diagnosed.as_deref().map(parse_date).transpose()?;
            to_json(&scheduler.record_condition(&tc, &name, diagnosed, notes.as_deref())?)
        }
        Command::AddMedication { tc, name, dosage, frequency, inactive } => {
            to_json(&scheduler.record_medication(&tc, &name, &dosage, &frequency, !inactive)?)
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::Parse {
        what: "date",
        value: s.to_string(),
    })
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, CliError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").map_err(|_| CliError::Parse {
        what: "date and time",
        value: s.to_string(),
    })
}

fn parse_id(s: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(s).map_err(|_| CliError::Parse {
        what: "appointment id",
        value: s.to_string(),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn run_args(dir: &std::path::Path, args: &[&str]) -> Result<serde_json::Value, CliError> {
        let data_dir = dir.to_string_lossy().into_owned();
        let argv = ["patient-router", "--data-dir", data_dir.as_str()]
            .into_iter()
            .chain(args.iter().copied());
        let json = run(Cli::try_parse_from(argv).unwrap())?;
        Ok(serde_json::from_str(&json).unwrap())
    }

    fn register(dir: &std::path::Path, tc: &str) {
        run_args(dir, &["register", "--tc", tc, "--name", "Ayse Yilmaz", "--dob", "1985-04-12"])
            .unwrap();
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn appointment_lifecycle_from_the_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let tc = "12345678901";
        register(dir.path(), tc);
        let booked = run_args(
            dir.path(),
            &[
                "book", "--tc", tc, "--doctor", "Dr. Emma Wilson", "--department", "cardiology",
                "--at", "2025-03-10 09:00",
            ],
        )
        .unwrap();
        let id = booked["id"].as_str().unwrap().to_string();

        let moved =
            run_args(dir.path(), &["reschedule", id.as_str(), "--at", "2025-03-11 14:00"]).unwrap();
        assert_eq!(moved["scheduled_at"], "2025-03-11T14:00:00");

        let done =
            run_args(dir.path(), &["complete", id.as_str(), "--diagnosis", "Angina"]).unwrap();
        assert_eq!(done["status"], "completed");
        assert!(matches!(
            run_args(dir.path(), &["cancel", id.as_str()]),
            Err(CliError::Triage(TriageError::InvalidTransition { .. }))
        ));

        let listed = run_args(dir.path(), &["appointments", "--tc", tc]).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn recorded_medication_shows_up_in_triage() {
        let dir = tempfile::tempdir().unwrap();
        let tc = "12345678901";
        register(dir.path(), tc);
        run_args(
            dir.path(),
            &["add-medication", "--tc", tc, "--name", "Beloc", "--dosage", "50mg"],
        )
        .unwrap();
        run_args(
            dir.path(),
            &["add-condition", "--tc", tc, "--name", "Hypertension", "--diagnosed", "2019-06-01"],
        )
        .unwrap();

        let outcome = run_args(dir.path(), &["triage", "--tc", tc, "chest", "pain"]).unwrap();
        let notes: Vec<&str> = outcome["patient_notes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|n| n.as_str())
            .collect();
        assert!(notes.iter().any(|n| n.ends_with("Beloc (50mg)")));
        assert!(notes.iter().any(|n| n.ends_with("Hypertension")));
    }

    #[test]
    fn malformed_arguments_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_args(dir.path(), &["reschedule", "not-a-uuid", "--at", "2025-03-11 14:00"]),
            Err(CliError::Parse { what: "appointment id", .. })
        ));
        assert!(matches!(
            run_args(
                dir.path(),
                &[
                    "slots", "--doctor", "Dr. Emma Wilson", "--from", "2025-03-10", "--days",
                    "4294967295",
                ],
            ),
            Err(CliError::Triage(TriageError::InvalidInput(_)))
        ));
    }
}

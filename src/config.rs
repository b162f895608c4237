use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "PatientRouter";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that relocates the data directory (tests, containers).
pub const HOME_ENV: &str = "PATIENT_ROUTER_HOME";

/// Get the application data directory.
/// `$PATIENT_ROUTER_HOME` when set, otherwise ~/PatientRouter/.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub const DATABASE_FILE: &str = "appointments.db";
pub const REFERENCE_DIR: &str = "reference";
pub const ROUTING_CONFIG_FILE: &str = "routing.json";

/// Path of the appointment database
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

/// Directory holding department, symptom and roster JSON overrides
pub fn reference_dir() -> PathBuf {
    app_data_dir().join(REFERENCE_DIR)
}

/// Optional weight/threshold overrides (see `routing_config`)
pub fn routing_config_path() -> PathBuf {
    app_data_dir().join(ROUTING_CONFIG_FILE)
}

/// Log filter used when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "patient_router_lib=info,patient_router=info,warn"
}

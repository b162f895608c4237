pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod routing;
pub mod routing_config;
pub mod scheduling;

use tracing_subscriber::EnvFilter;

pub use core_state::CoreState;
pub use routing::{IntakeRouter, ReferenceData, SymptomReport, TriageError, TriageOutcome};
pub use routing_config::RoutingConfig;
pub use scheduling::{AppointmentStore, Scheduler, SqliteAppointmentStore};

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// built-in filter. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("Patient router v{}", config::APP_VERSION);
}

//! Runtime configuration types for payflow.
//!
//! These are the validated values the processors are built from. Parsing the
//! TOML file and applying CLI/environment overrides is the server's job.

mod destination;
mod emission;
mod reconciliation;

pub use destination::TransferDestination;
pub use emission::{BatchConfig, MAX_BATCH_SIZE, MAX_SCHEDULE_HOURS, ScheduleConfig};
pub use reconciliation::ReconciliationConfig;

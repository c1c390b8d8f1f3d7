pub mod config;
pub mod types;

pub use config::{HydraConfig, ReportedServer, ReporterConfig};
pub use types::*;

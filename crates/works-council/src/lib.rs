pub mod config;
pub mod council;
pub mod error;
pub mod telemetry;

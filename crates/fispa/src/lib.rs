pub mod config;
pub mod error;
pub mod requests;
pub mod telemetry;

pub mod config;
pub mod error;
pub mod remote;
pub mod telemetry;
pub mod workflows;

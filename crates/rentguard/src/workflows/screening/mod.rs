//! Document screening: submission pipeline, progress simulation, and trust scoring.
//!
//! [`SubmissionController`] owns the pending input and a single submission slot. It issues
//! one remote analysis per submit while [`ProgressSimulator`] drives the stage indicator,
//! and [`compute_display_metrics`] turns the settled result into score, grade, and tier.

pub mod classify;
pub mod controller;
pub mod domain;
pub mod progress;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use classify::{classify_failure, ErrorKind, SubmissionError};
pub use controller::SubmissionController;
pub use domain::{
    AnalysisFields, AnalysisRequest, AnalysisResult, Language, LeaseClause, ProgressStage,
    RiskLevel, ScamLikelihood, SubmissionState, TrustGrade,
};
pub use progress::{ProgressSimulator, ScheduledTask, PROGRESS_CAP};
pub use scoring::{compute_display_metrics, DisplayMetrics, ScoreSource};

//! Suspect leaser reporting and its verification flow.

pub mod domain;
pub mod flow;

#[cfg(test)]
mod tests;

pub use domain::{
    ReportFlowState, ReportReceipt, SuspectLeaser, VerificationProgress, VerificationStep,
};
pub use flow::{ReportError, ReportFlow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::flow::ReportError;
use crate::workflows::screening::domain::deserialize_optional_timestamp;
use crate::workflows::DocumentBlob;

/// Landlord or lister previously flagged by users. The remote store owns the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspectLeaser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub reported_count: u64,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl SuspectLeaser {
    /// Stores the count returned by the service. The client never increments locally.
    pub fn apply_reported_count(&mut self, reported_count: u64) {
        self.reported_count = reported_count;
    }
}

/// Simulated verification steps, in the order they are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStep {
    Files,
    Content,
    Metadata,
    Evidence,
    Identity,
}

impl VerificationStep {
    pub const ALL: [VerificationStep; 5] = [
        VerificationStep::Files,
        VerificationStep::Content,
        VerificationStep::Metadata,
        VerificationStep::Evidence,
        VerificationStep::Identity,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            VerificationStep::Files => "Verifying uploaded files...",
            VerificationStep::Content => "Analyzing document content...",
            VerificationStep::Metadata => "Checking document metadata...",
            VerificationStep::Evidence => "Validating evidence...",
            VerificationStep::Identity => "Confirming your identity...",
        }
    }
}

/// Progress shown while the simulated steps run. Capped at
/// [`VerificationProgress::STEP_PROGRESS_CAP`] until every step is logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationProgress {
    pub log: Vec<VerificationStep>,
    pub progress: u8,
    /// Failure of the last mutation attempt; cleared when a retry starts.
    pub error: Option<ReportError>,
}

impl VerificationProgress {
    pub const STEP_PROGRESS_CAP: u8 = 85;

    pub fn steps_completed(&self) -> usize {
        self.log.len()
    }

    pub fn next_step(&self) -> Option<VerificationStep> {
        VerificationStep::ALL.get(self.log.len()).copied()
    }

    pub fn steps_done(&self) -> bool {
        self.next_step().is_none()
    }

    pub(crate) fn record(&mut self, step: VerificationStep) {
        self.log.push(step);
        let total = VerificationStep::ALL.len();
        let percent = self.log.len() * 100 / total;
        self.progress = percent.min(usize::from(Self::STEP_PROGRESS_CAP)) as u8;
    }
}

/// Authoritative outcome of a committed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportReceipt {
    pub leaser_id: String,
    pub reported_count: u64,
}

/// Forward-only lifecycle of one report attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFlowState {
    Collecting { evidence: Vec<DocumentBlob> },
    Verifying(VerificationProgress),
    Done(ReportReceipt),
}

impl Default for ReportFlowState {
    fn default() -> Self {
        ReportFlowState::Collecting {
            evidence: Vec::new(),
        }
    }
}

impl ReportFlowState {
    pub fn verification(&self) -> Option<&VerificationProgress> {
        match self {
            ReportFlowState::Verifying(progress) => Some(progress),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&ReportReceipt> {
        match self {
            ReportFlowState::Done(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            ReportFlowState::Collecting { .. } => "collecting",
            ReportFlowState::Verifying(_) => "verifying",
            ReportFlowState::Done(_) => "done",
        }
    }
}

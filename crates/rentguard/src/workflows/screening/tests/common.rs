use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand_core::RngCore;

use crate::config::PacingConfig;
use crate::remote::{
    HealthStatus, RentalAnalysisBackend, ReportAck, SuspectLeaserQuery, TransportError,
};
use crate::workflows::reporting::SuspectLeaser;
use crate::workflows::screening::{
    AnalysisFields, AnalysisResult, LeaseClause, ScamLikelihood, SubmissionController,
};
use crate::workflows::DocumentBlob;

/// Always yields the same word, so every progress tick adds `MIN_INCREMENT + word % 7`.
pub(super) struct FixedRng(pub(super) u32);

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.0
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.0)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        dest.fill(0);
        Ok(())
    }
}

pub(super) fn clause(text: &str, concerning: bool) -> LeaseClause {
    LeaseClause {
        original_text: text.to_string(),
        simplified_text: text.to_lowercase(),
        is_concerning: concerning,
        reason: concerning.then(|| "Unfavorable to the tenant.".to_string()),
        legal_reference: None,
    }
}

/// `total` clauses of which the first `concerning` are flagged.
pub(super) fn clauses(concerning: usize, total: usize) -> Vec<LeaseClause> {
    (0..total)
        .map(|index| clause(&format!("Clause {index}"), index < concerning))
        .collect()
}

pub(super) fn result(likelihood: ScamLikelihood, clauses: Vec<LeaseClause>) -> AnalysisResult {
    AnalysisResult {
        id: Some("analysis-1".to_string()),
        scam_likelihood: likelihood,
        trustworthiness_score: None,
        trustworthiness_grade: None,
        risk_level: None,
        explanation: "The lease follows common residential terms.".to_string(),
        clauses,
        suggested_questions: vec!["Can I view the unit in person?".to_string()],
        action_items: None,
        created_at: None,
    }
}

pub(super) fn lease(name: &str) -> DocumentBlob {
    DocumentBlob::new(name, format!("contents of {name}").into_bytes())
}

pub(super) fn pacing() -> PacingConfig {
    PacingConfig {
        progress_tick: Duration::from_millis(500),
        report_step_interval: Duration::from_millis(1200),
        report_settle: Duration::from_millis(800),
    }
}

pub(super) fn controller(
    backend: Arc<RecordingBackend>,
) -> SubmissionController<RecordingBackend> {
    SubmissionController::new(backend, pacing()).with_rng(|| Box::new(FixedRng(0)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum AnalysisCall {
    Listing(AnalysisFields),
    Document(String),
    Documents(Vec<String>),
}

/// Backend double that records each analysis call and answers with a configured outcome,
/// optionally after a delay.
pub(super) struct RecordingBackend {
    calls: Mutex<Vec<AnalysisCall>>,
    outcome: Mutex<Result<AnalysisResult, TransportError>>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub(super) fn answering(result: AnalysisResult) -> Self {
        Self::with_outcome(Ok(result))
    }

    pub(super) fn failing(error: TransportError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<AnalysisResult, TransportError>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcome: Mutex::new(outcome),
            delay: None,
        }
    }

    pub(super) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn calls(&self) -> Vec<AnalysisCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    async fn respond(&self, call: AnalysisCall) -> Result<AnalysisResult, TransportError> {
        self.calls.lock().expect("calls mutex").push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.lock().expect("outcome mutex").clone()
    }
}

#[async_trait]
impl RentalAnalysisBackend for RecordingBackend {
    async fn analyze_rental(
        &self,
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        self.respond(AnalysisCall::Listing(fields.clone())).await
    }

    async fn upload_document(
        &self,
        document: &DocumentBlob,
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        self.respond(AnalysisCall::Document(document.file_name.clone()))
            .await
    }

    async fn upload_documents(
        &self,
        documents: &[DocumentBlob],
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        let names = documents
            .iter()
            .map(|document| document.file_name.clone())
            .collect();
        self.respond(AnalysisCall::Documents(names)).await
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            message: String::new(),
        })
    }

    async fn report_suspect_leaser(&self, _leaser_id: &str) -> Result<ReportAck, TransportError> {
        Err(TransportError::Remote("reports are not served here".to_string()))
    }

    async fn search_suspect_leasers(
        &self,
        _query: &SuspectLeaserQuery,
    ) -> Result<Vec<SuspectLeaser>, TransportError> {
        Ok(Vec::new())
    }
}

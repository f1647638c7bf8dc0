use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PacingConfig;
use crate::remote::{
    HealthStatus, RentalAnalysisBackend, ReportAck, SuspectLeaserQuery, TransportError,
};
use crate::workflows::reporting::{ReportFlow, SuspectLeaser};
use crate::workflows::screening::{AnalysisFields, AnalysisResult};
use crate::workflows::DocumentBlob;

pub(super) const STEP: Duration = Duration::from_millis(1200);
pub(super) const SETTLE: Duration = Duration::from_millis(800);

pub(super) fn pacing() -> PacingConfig {
    PacingConfig {
        progress_tick: Duration::from_millis(500),
        report_step_interval: STEP,
        report_settle: SETTLE,
    }
}

pub(super) fn leaser() -> SuspectLeaser {
    SuspectLeaser {
        id: "leaser-7".to_string(),
        name: "Morgan Vale".to_string(),
        email: Some("keys@quickrent.example".to_string()),
        phone: None,
        addresses: vec!["88 Canal Street".to_string()],
        flags: vec!["asks for wire transfers".to_string()],
        reported_count: 3,
        created_at: None,
    }
}

pub(super) fn evidence(name: &str) -> DocumentBlob {
    DocumentBlob::new(name, b"screenshot".to_vec())
}

pub(super) fn flow(backend: Arc<ScriptedReports>) -> ReportFlow<ScriptedReports> {
    ReportFlow::new(backend, leaser(), pacing())
}

pub(super) fn acknowledged(reported_count: u64) -> Result<ReportAck, TransportError> {
    Ok(ReportAck {
        success: true,
        reported_count: Some(reported_count),
        message: Some("Report submitted successfully".to_string()),
    })
}

/// Answers report mutations from a script, one entry per call.
pub(super) struct ScriptedReports {
    script: Mutex<VecDeque<Result<ReportAck, TransportError>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedReports {
    pub(super) fn new(script: impl IntoIterator<Item = Result<ReportAck, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub(super) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex").clone()
    }
}

#[async_trait]
impl RentalAnalysisBackend for ScriptedReports {
    async fn analyze_rental(
        &self,
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Err(TransportError::Remote("analysis is not served here".to_string()))
    }

    async fn upload_document(
        &self,
        _document: &DocumentBlob,
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Err(TransportError::Remote("analysis is not served here".to_string()))
    }

    async fn upload_documents(
        &self,
        _documents: &[DocumentBlob],
        _fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        Err(TransportError::Remote("analysis is not served here".to_string()))
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        Err(TransportError::Network("offline".to_string()))
    }

    async fn report_suspect_leaser(&self, leaser_id: &str) -> Result<ReportAck, TransportError> {
        self.calls
            .lock()
            .expect("calls mutex")
            .push(leaser_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .expect("script mutex")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Remote("script exhausted".to_string())))
    }

    async fn search_suspect_leasers(
        &self,
        _query: &SuspectLeaserQuery,
    ) -> Result<Vec<SuspectLeaser>, TransportError> {
        Ok(Vec::new())
    }
}

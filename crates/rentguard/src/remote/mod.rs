//! Boundary to the remote analysis service.

mod demo;
mod http;

pub use demo::DemoBackend;
pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::workflows::reporting::SuspectLeaser;
use crate::workflows::screening::{AnalysisFields, AnalysisResult, Language};
use crate::workflows::DocumentBlob;

/// Operations consumed from the remote service. Implementations perform exactly one remote
/// call per method invocation and never retry.
#[async_trait]
pub trait RentalAnalysisBackend: Send + Sync {
    /// Analyze a listing from its URL and/or address alone.
    async fn analyze_rental(&self, fields: &AnalysisFields)
        -> Result<AnalysisResult, TransportError>;

    async fn upload_document(
        &self,
        document: &DocumentBlob,
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError>;

    async fn upload_documents(
        &self,
        documents: &[DocumentBlob],
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError>;

    async fn health(&self) -> Result<HealthStatus, TransportError>;

    /// Increments the report count of a suspect leaser by one.
    async fn report_suspect_leaser(&self, leaser_id: &str) -> Result<ReportAck, TransportError>;

    async fn search_suspect_leasers(
        &self,
        query: &SuspectLeaserQuery,
    ) -> Result<Vec<SuspectLeaser>, TransportError>;
}

/// Raw failure of a remote call, before user-facing classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request did not complete: {0}")]
    Network(String),
    #[error("service responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response body could not be decoded: {0}")]
    Decode(String),
    #[error("service reported a failure: {0}")]
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Response of the report mutation. `reported_count` is the authoritative new value and must
/// be present on a successful acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Lookup criteria for suspect leasers; at least one field must be filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuspectLeaserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub language: Language,
}

impl SuspectLeaserQuery {
    pub fn is_empty(&self) -> bool {
        self.filled_fields().next().is_none()
    }

    pub(crate) fn filled_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", self.name.as_deref()),
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("address", self.address.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("enter at least one of name, email, phone, or address")]
    EmptyQuery,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Validates the query locally before issuing the lookup.
pub async fn search_suspect_leasers<B>(
    backend: &B,
    query: &SuspectLeaserQuery,
) -> Result<Vec<SuspectLeaser>, SearchError>
where
    B: RentalAnalysisBackend + ?Sized,
{
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    Ok(backend.search_suspect_leasers(query).await?)
}

/// Connectivity indicator for the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Connectivity {
    Online { status: String, message: String },
    Offline { reason: String },
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online { .. })
    }
}

/// Probes the health endpoint. Failures degrade to [`Connectivity::Offline`] and never block
/// anything else.
pub async fn check_connectivity<B>(backend: &B) -> Connectivity
where
    B: RentalAnalysisBackend + ?Sized,
{
    match backend.health().await {
        Ok(HealthStatus { status, message }) => Connectivity::Online { status, message },
        Err(err) => {
            warn!(error = %err, "analysis service health check failed; showing offline mode");
            Connectivity::Offline {
                reason: err.to_string(),
            }
        }
    }
}

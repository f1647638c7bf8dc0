use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{HealthStatus, RentalAnalysisBackend, ReportAck, SuspectLeaserQuery, TransportError};
use crate::config::RemoteConfig;
use crate::workflows::reporting::SuspectLeaser;
use crate::workflows::screening::{AnalysisFields, AnalysisResult};
use crate::workflows::DocumentBlob;

const ANALYZE_RENTAL_PATH: &str = "analysis/analyze-rental";
const UPLOAD_DOCUMENT_PATH: &str = "upload/document";
const UPLOAD_DOCUMENTS_PATH: &str = "upload/documents";
const HEALTH_PATH: &str = "health";
const SUSPECT_LEASERS_PATH: &str = "suspect-leasers/";
const SUSPECT_LEASER_SEARCH_PATH: &str = "suspect-leasers/search";

/// reqwest transport for the analysis service. Timeouts are left to the client defaults.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &RemoteConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &RemoteConfig) -> Self {
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|err| TransportError::Network(format!("invalid endpoint '{path}': {err}")))
    }

    fn form_with_fields(fields: &AnalysisFields) -> Form {
        let mut form = Form::new()
            .text("language", fields.language.as_str())
            .text("voice_output", fields.voice_output.to_string());
        if let Some(url) = &fields.listing_url {
            form = form.text("listing_url", url.clone());
        }
        if let Some(address) = &fields.property_address {
            form = form.text("property_address", address.clone());
        }
        form
    }

    fn document_part(document: &DocumentBlob) -> Result<Part, TransportError> {
        if document.is_empty() {
            warn!(file_name = %document.file_name, "uploading an empty document");
        }
        Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type())
            .map_err(|err| TransportError::Network(err.to_string()))
    }

    async fn send_multipart(
        &self,
        path: &str,
        form: Form,
    ) -> Result<AnalysisResult, TransportError> {
        let url = self.endpoint(path)?;
        debug!(%url, "uploading documents for analysis");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;
        decode_response(response).await
    }
}

#[async_trait]
impl RentalAnalysisBackend for HttpBackend {
    async fn analyze_rental(
        &self,
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        let url = self.endpoint(ANALYZE_RENTAL_PATH)?;
        debug!(%url, language = %fields.language, "requesting listing analysis");
        let response = self
            .client
            .post(url)
            .json(fields)
            .send()
            .await
            .map_err(network_error)?;
        decode_response(response).await
    }

    async fn upload_document(
        &self,
        document: &DocumentBlob,
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        let form = Self::form_with_fields(fields).part("file", Self::document_part(document)?);
        self.send_multipart(UPLOAD_DOCUMENT_PATH, form).await
    }

    async fn upload_documents(
        &self,
        documents: &[DocumentBlob],
        fields: &AnalysisFields,
    ) -> Result<AnalysisResult, TransportError> {
        let mut form = Self::form_with_fields(fields);
        for document in documents {
            form = form.part("files", Self::document_part(document)?);
        }
        self.send_multipart(UPLOAD_DOCUMENTS_PATH, form).await
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        let url = self.endpoint(HEALTH_PATH)?;
        let response = self.client.get(url).send().await.map_err(network_error)?;
        decode_response(response).await
    }

    async fn report_suspect_leaser(&self, leaser_id: &str) -> Result<ReportAck, TransportError> {
        let mut url = self.endpoint(SUSPECT_LEASERS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Network("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(leaser_id)
            .push("report");

        info!(leaser_id, "submitting suspect leaser report");
        let response = self.client.post(url).send().await.map_err(network_error)?;
        decode_response(response).await
    }

    async fn search_suspect_leasers(
        &self,
        query: &SuspectLeaserQuery,
    ) -> Result<Vec<SuspectLeaser>, TransportError> {
        let mut url = self.endpoint(SUSPECT_LEASER_SEARCH_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.filled_fields() {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("language", query.language.as_str());
        }

        let response = self.client.get(url).send().await.map_err(network_error)?;
        decode_response(response).await
    }
}

fn network_error(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.bytes().await.map_err(network_error)?;

    if !status.is_success() {
        let message =
            error_message(&body).unwrap_or_else(|| format!("API error: {}", status.as_u16()));
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body).map_err(|err| TransportError::Decode(err.to_string()))
}

/// Pulls `detail`, then `message`, out of a JSON error body.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message"]
        .iter()
        .find_map(|key| match value.get(key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Null => None,
            Value::String(_) => None,
            other => Some(other.to_string()),
        })
}

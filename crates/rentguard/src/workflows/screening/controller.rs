use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand_core::{OsRng, RngCore};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::classify::SubmissionError;
use super::domain::{AnalysisRequest, AnalysisResult, Language, SubmissionState};
use super::progress::ProgressSimulator;
use super::scoring::{compute_display_metrics, DisplayMetrics};
use crate::config::PacingConfig;
use crate::remote::{RentalAnalysisBackend, TransportError};
use crate::workflows::DocumentBlob;

type RngFactory = Arc<dyn Fn() -> Box<dyn RngCore + Send> + Send + Sync>;

#[derive(Debug, Default)]
struct PendingInput {
    files: Vec<DocumentBlob>,
    listing_url: Option<String>,
    address: Option<String>,
}

impl PendingInput {
    fn request(&self, language: Language, voice_output: bool) -> AnalysisRequest {
        AnalysisRequest {
            files: self.files.clone(),
            listing_url: self.listing_url.clone(),
            address: self.address.clone(),
            language,
            voice_output,
        }
    }
}

/// Owns the pending input and one submission slot. At most one analysis is outstanding per
/// controller. Every state change is published through [`SubmissionController::subscribe`].
pub struct SubmissionController<B: ?Sized> {
    backend: Arc<B>,
    pacing: PacingConfig,
    rng: RngFactory,
    pending: Mutex<PendingInput>,
    state: Arc<watch::Sender<SubmissionState>>,
}

impl<B> SubmissionController<B>
where
    B: RentalAnalysisBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, pacing: PacingConfig) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            backend,
            pacing,
            rng: Arc::new(|| Box::new(OsRng) as Box<dyn RngCore + Send>),
            pending: Mutex::new(PendingInput::default()),
            state: Arc::new(state),
        }
    }

    /// Replaces the randomness behind progress increments.
    pub fn with_rng<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn RngCore + Send> + Send + Sync + 'static,
    {
        self.rng = Arc::new(factory);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Metrics for the settled result, recomputed on every call.
    pub fn display_metrics(&self) -> Option<DisplayMetrics> {
        self.state.borrow().result().map(compute_display_metrics)
    }

    pub fn pending_files(&self) -> Vec<DocumentBlob> {
        self.lock_pending().files.clone()
    }

    /// Appends to the pending files and clears a settled outcome. Returns the new file count.
    pub fn select_files(
        &self,
        files: impl IntoIterator<Item = DocumentBlob>,
    ) -> Result<usize, SubmissionError> {
        let mut pending = self.lock_pending();
        self.ensure_not_uploading()?;
        pending.files.extend(files);
        self.clear_outcome();
        debug!(
            files = pending.files.len(),
            bytes = pending.files.iter().map(DocumentBlob::len).sum::<usize>(),
            "pending files updated"
        );
        Ok(pending.files.len())
    }

    /// Removes one pending file. `Ok(None)` when `index` is out of range.
    pub fn remove_file(&self, index: usize) -> Result<Option<DocumentBlob>, SubmissionError> {
        let mut pending = self.lock_pending();
        self.ensure_not_uploading()?;
        if index >= pending.files.len() {
            return Ok(None);
        }
        Ok(Some(pending.files.remove(index)))
    }

    pub fn set_listing_url(&self, url: Option<String>) -> Result<(), SubmissionError> {
        let mut pending = self.lock_pending();
        self.ensure_not_uploading()?;
        pending.listing_url = url;
        Ok(())
    }

    pub fn set_address(&self, address: Option<String>) -> Result<(), SubmissionError> {
        let mut pending = self.lock_pending();
        self.ensure_not_uploading()?;
        pending.address = address;
        Ok(())
    }

    /// Returns a settled slot to `Idle`. Pending input is kept for resubmission.
    pub fn reset(&self) -> Result<(), SubmissionError> {
        let _pending = self.lock_pending();
        self.ensure_not_uploading()?;
        self.state.send_replace(SubmissionState::Idle);
        Ok(())
    }

    /// Runs one analysis of the pending input.
    ///
    /// Fails with [`SubmissionError::Validation`] when there is nothing to analyze, with
    /// [`SubmissionError::Busy`] while another submission is outstanding, and with
    /// [`SubmissionError::Settled`] until a settled slot is back at `Idle`; none of these
    /// touches the network. Otherwise exactly one remote call is made and its outcome becomes the
    /// new state. The progress ticker is stopped before that final update.
    pub async fn submit(
        &self,
        language: Language,
        voice_output: bool,
    ) -> Result<AnalysisResult, SubmissionError> {
        let request = self.claim(language, voice_output)?;
        let mut in_flight = InFlight {
            state: &self.state,
            armed: true,
        };

        info!(
            files = request.files.len(),
            has_listing_url = request.fields().listing_url.is_some(),
            language = %language,
            "submitting rental analysis"
        );

        let ticker = ProgressSimulator::new((self.rng)()).start(self.pacing.progress_tick, {
            let state = Arc::clone(&self.state);
            move |progress| {
                state.send_if_modified(|current| {
                    if current.is_uploading() {
                        *current = SubmissionState::uploading(progress);
                        true
                    } else {
                        false
                    }
                });
            }
        });

        let outcome = self.dispatch(&request).await;
        ticker.cancel().await;

        let outcome = outcome
            .map_err(SubmissionError::from)
            .and_then(ensure_complete);
        match &outcome {
            Ok(result) => {
                info!(
                    scam_likelihood = ?result.scam_likelihood,
                    concerning_clauses = result.concerning_clause_count(),
                    "rental analysis completed"
                );
                self.state
                    .send_replace(SubmissionState::Succeeded(Box::new(result.clone())));
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "rental analysis failed");
                self.state.send_replace(SubmissionState::Failed(err.clone()));
            }
        }
        in_flight.armed = false;

        outcome
    }

    /// Validates the pending input and moves the slot from `Idle` to `Uploading` in one step.
    fn claim(
        &self,
        language: Language,
        voice_output: bool,
    ) -> Result<AnalysisRequest, SubmissionError> {
        let pending = self.lock_pending();
        let request = pending.request(language, voice_output);

        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            SubmissionState::Uploading { .. } => {
                rejection = Some(SubmissionError::Busy);
                false
            }
            SubmissionState::Succeeded(_) | SubmissionState::Failed(_) => {
                rejection = Some(SubmissionError::Settled);
                false
            }
            SubmissionState::Idle if !request.has_input() => {
                rejection = Some(SubmissionError::Validation);
                false
            }
            SubmissionState::Idle => {
                *state = SubmissionState::uploading(0);
                true
            }
        });

        match rejection {
            Some(err) => {
                debug!(error = %err, "submission rejected");
                Err(err)
            }
            None => Ok(request),
        }
    }

    async fn dispatch(&self, request: &AnalysisRequest) -> Result<AnalysisResult, TransportError> {
        let fields = request.fields();
        match request.files.as_slice() {
            [] => self.backend.analyze_rental(&fields).await,
            [document] => self.backend.upload_document(document, &fields).await,
            documents => self.backend.upload_documents(documents, &fields).await,
        }
    }

    fn ensure_not_uploading(&self) -> Result<(), SubmissionError> {
        if self.state.borrow().is_uploading() {
            return Err(SubmissionError::Busy);
        }
        Ok(())
    }

    fn clear_outcome(&self) {
        self.state.send_if_modified(|state| match state {
            SubmissionState::Succeeded(_) | SubmissionState::Failed(_) => {
                *state = SubmissionState::Idle;
                true
            }
            _ => false,
        });
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingInput> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_complete(result: AnalysisResult) -> Result<AnalysisResult, SubmissionError> {
    if result.explanation.trim().is_empty() {
        return Err(SubmissionError::MalformedResponse(
            "analysis result has no explanation".to_string(),
        ));
    }
    Ok(result)
}

/// Frees the slot if a submit future is dropped before it settles.
struct InFlight<'a> {
    state: &'a watch::Sender<SubmissionState>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_if_modified(|state| {
                if state.is_uploading() {
                    *state = SubmissionState::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

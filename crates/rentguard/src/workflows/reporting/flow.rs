use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::domain::{ReportFlowState, ReportReceipt, SuspectLeaser, VerificationProgress};
use crate::config::PacingConfig;
use crate::remote::{RentalAnalysisBackend, ReportAck, TransportError};
use crate::workflows::DocumentBlob;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("attach at least one evidence file before verifying")]
    Validation,
    #[error("evidence can only change while collecting")]
    EvidenceLocked,
    #[error("verification is already running")]
    InFlight,
    #[error("the report is being submitted and can no longer be aborted")]
    MutationInFlight,
    #[error("verification was aborted")]
    Aborted,
    #[error("the report has already been submitted")]
    Completed,
    #[error("the service rejected the report: {0}")]
    Rejected(String),
    #[error("report could not be submitted: {0}")]
    Remote(#[from] TransportError),
}

#[derive(Debug, Default)]
struct Control {
    leaser: Option<SuspectLeaser>,
    /// Evidence moved aside while verifying, restored by an abort.
    retained: Vec<DocumentBlob>,
    /// Bumped by every `advance` start and by `abort`; a run whose attempt is stale stops.
    attempt: u64,
    running: bool,
    mutation_in_flight: bool,
}

/// Multi-step confirmation flow gating one report mutation against a suspect leaser.
///
/// `Collecting -> Verifying -> Done`. The verification steps are a paced delay with no
/// analytical effect; only the final mutation talks to the service, and only its failure
/// can keep the flow in `Verifying`. Retrying after a failure reissues just the mutation.
pub struct ReportFlow<B: ?Sized> {
    backend: Arc<B>,
    leaser_id: String,
    pacing: PacingConfig,
    control: Mutex<Control>,
    state: watch::Sender<ReportFlowState>,
}

impl<B> ReportFlow<B>
where
    B: RentalAnalysisBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, leaser: SuspectLeaser, pacing: PacingConfig) -> Self {
        let (state, _) = watch::channel(ReportFlowState::default());
        Self {
            backend,
            leaser_id: leaser.id.clone(),
            pacing,
            control: Mutex::new(Control {
                leaser: Some(leaser),
                ..Control::default()
            }),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReportFlowState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReportFlowState {
        self.state.borrow().clone()
    }

    /// The leaser as last known, including a count applied from the service.
    pub fn leaser(&self) -> Option<SuspectLeaser> {
        self.lock_control().leaser.clone()
    }

    pub fn add_evidence(
        &self,
        files: impl IntoIterator<Item = DocumentBlob>,
    ) -> Result<usize, ReportError> {
        let _control = self.lock_control();
        let mut added = None;
        self.state.send_if_modified(|state| match state {
            ReportFlowState::Collecting { evidence } => {
                evidence.extend(files);
                added = Some(evidence.len());
                true
            }
            _ => false,
        });
        added.ok_or(ReportError::EvidenceLocked)
    }

    /// Removes one evidence file. `Ok(None)` when `index` is out of range.
    pub fn remove_evidence(&self, index: usize) -> Result<Option<DocumentBlob>, ReportError> {
        let _control = self.lock_control();
        let mut outcome = Err(ReportError::EvidenceLocked);
        self.state.send_if_modified(|state| match state {
            ReportFlowState::Collecting { evidence } if index < evidence.len() => {
                outcome = Ok(Some(evidence.remove(index)));
                true
            }
            ReportFlowState::Collecting { .. } => {
                outcome = Ok(None);
                false
            }
            _ => false,
        });
        outcome
    }

    /// Moves the flow forward until the report is committed.
    ///
    /// From `Collecting` this requires evidence, then logs each verification step at the
    /// configured interval, reaches 100%, pauses, and issues exactly one mutation. From a
    /// `Verifying` state left by a failed mutation it goes straight to the mutation.
    pub async fn advance(&self) -> Result<ReportReceipt, ReportError> {
        let (attempt, skip_settle) = self.begin()?;
        let mut run = Run {
            control: &self.control,
            attempt,
        };

        if !skip_settle {
            self.run_steps(attempt).await?;
            self.update_progress(attempt, |progress| progress.progress = 100)?;
            tokio::time::sleep(self.pacing.report_settle).await;
        }

        self.enter_mutation(attempt)?;
        info!(leaser_id = %self.leaser_id, "submitting suspect leaser report");
        let outcome = self.backend.report_suspect_leaser(&self.leaser_id).await;
        let outcome = match outcome {
            Ok(ReportAck {
                success: true,
                reported_count: Some(reported_count),
                ..
            }) => Ok(ReportReceipt {
                leaser_id: self.leaser_id.clone(),
                reported_count,
            }),
            Ok(ReportAck { success: true, .. }) => Err(ReportError::Remote(TransportError::Decode(
                "report acknowledgement has no reported_count".to_string(),
            ))),
            Ok(ack) => Err(ReportError::Rejected(
                ack.message
                    .unwrap_or_else(|| "Failed to submit report".to_string()),
            )),
            Err(err) => Err(ReportError::from(err)),
        };

        let settled = self.settle(outcome);
        run.finish();
        settled
    }

    /// Returns a verifying flow to `Collecting`, keeping its evidence. A running
    /// [`ReportFlow::advance`] notices at its next step boundary and fails with
    /// [`ReportError::Aborted`].
    pub fn abort(&self) -> Result<(), ReportError> {
        let mut control = self.lock_control();
        if control.mutation_in_flight {
            return Err(ReportError::MutationInFlight);
        }

        match &*self.state.borrow() {
            ReportFlowState::Done(_) => return Err(ReportError::Completed),
            ReportFlowState::Collecting { .. } => return Ok(()),
            ReportFlowState::Verifying(_) => {}
        }

        control.attempt += 1;
        control.running = false;
        let evidence = mem::take(&mut control.retained);
        info!(
            leaser_id = %self.leaser_id,
            evidence = evidence.len(),
            "report verification aborted"
        );
        self.state.send_replace(ReportFlowState::Collecting { evidence });
        Ok(())
    }

    /// Discards the flow, returning where it ended.
    pub fn close(self) -> ReportFlowState {
        debug!(leaser_id = %self.leaser_id, "report flow closed");
        let last = self.state.borrow().clone();
        last
    }

    /// Claims the run and returns its attempt number, plus whether the steps and settle
    /// pause are already behind it.
    fn begin(&self) -> Result<(u64, bool), ReportError> {
        let mut control = self.lock_control();
        if control.running {
            return Err(ReportError::InFlight);
        }

        let mut outcome = Ok(false);
        self.state.send_if_modified(|state| match state {
            ReportFlowState::Done(_) => {
                outcome = Err(ReportError::Completed);
                false
            }
            ReportFlowState::Collecting { evidence } if evidence.is_empty() => {
                outcome = Err(ReportError::Validation);
                false
            }
            ReportFlowState::Collecting { evidence } => {
                control.retained = mem::take(evidence);
                *state = ReportFlowState::Verifying(VerificationProgress::default());
                true
            }
            ReportFlowState::Verifying(progress) => {
                outcome = Ok(progress.steps_done() && progress.progress == 100);
                progress.error = None;
                true
            }
        });

        let skip_settle = outcome.map_err(|err| {
            debug!(leaser_id = %self.leaser_id, error = %err, "report advance rejected");
            err
        })?;
        control.attempt += 1;
        control.running = true;
        Ok((control.attempt, skip_settle))
    }

    async fn run_steps(&self, attempt: u64) -> Result<(), ReportError> {
        loop {
            let next = self
                .state
                .borrow()
                .verification()
                .and_then(VerificationProgress::next_step);
            let Some(step) = next else {
                return Ok(());
            };

            tokio::time::sleep(self.pacing.report_step_interval).await;
            self.update_progress(attempt, |progress| progress.record(step))?;
            debug!(leaser_id = %self.leaser_id, step = step.label(), "verification step logged");
        }
    }

    fn update_progress(
        &self,
        attempt: u64,
        apply: impl FnOnce(&mut VerificationProgress),
    ) -> Result<(), ReportError> {
        let control = self.lock_control();
        if control.attempt != attempt {
            return Err(ReportError::Aborted);
        }
        self.state.send_modify(|state| {
            if let ReportFlowState::Verifying(progress) = state {
                apply(progress);
            }
        });
        Ok(())
    }

    fn enter_mutation(&self, attempt: u64) -> Result<(), ReportError> {
        let mut control = self.lock_control();
        if control.attempt != attempt {
            return Err(ReportError::Aborted);
        }
        control.mutation_in_flight = true;
        Ok(())
    }

    fn settle(
        &self,
        outcome: Result<ReportReceipt, ReportError>,
    ) -> Result<ReportReceipt, ReportError> {
        let mut control = self.lock_control();
        control.mutation_in_flight = false;

        match &outcome {
            Ok(receipt) => {
                info!(
                    leaser_id = %receipt.leaser_id,
                    reported_count = receipt.reported_count,
                    "suspect leaser report committed"
                );
                if let Some(leaser) = control.leaser.as_mut() {
                    leaser.apply_reported_count(receipt.reported_count);
                }
                control.retained.clear();
                self.state.send_replace(ReportFlowState::Done(receipt.clone()));
            }
            Err(err) => {
                warn!(leaser_id = %self.leaser_id, error = %err, "suspect leaser report failed");
                self.state.send_modify(|state| {
                    if let ReportFlowState::Verifying(progress) = state {
                        progress.error = Some(err.clone());
                    }
                });
            }
        }
        outcome
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the run claim when `advance` returns or its future is dropped.
struct Run<'a> {
    control: &'a Mutex<Control>,
    attempt: u64,
}

impl Run<'_> {
    fn finish(&mut self) {
        let mut control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if control.attempt == self.attempt {
            control.running = false;
            control.mutation_in_flight = false;
        }
    }
}

impl Drop for Run<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

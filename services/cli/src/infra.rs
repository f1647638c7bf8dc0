use rentguard::config::RemoteConfig;
use rentguard::error::AppError;
use rentguard::remote::{DemoBackend, HttpBackend, RentalAnalysisBackend};
use rentguard::workflows::reporting::{ReportFlowState, SuspectLeaser};
use rentguard::workflows::screening::{ScheduledTask, SubmissionState};
use rentguard::workflows::DocumentBlob;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Backend selected for this invocation.
pub(crate) enum Backend {
    Remote(Arc<HttpBackend>),
    Demo(Arc<DemoBackend>),
}

impl Backend {
    pub(crate) fn connect(remote: &RemoteConfig, demo: bool) -> Result<Self, AppError> {
        if demo {
            return Ok(Self::demo());
        }
        Ok(Self::Remote(Arc::new(HttpBackend::new(remote)?)))
    }

    pub(crate) fn demo() -> Self {
        info!("using built-in demo backend");
        Self::Demo(Arc::new(DemoBackend::default()))
    }

    pub(crate) fn shared(&self) -> Arc<dyn RentalAnalysisBackend> {
        match self {
            Backend::Remote(backend) => backend.clone(),
            Backend::Demo(backend) => backend.clone(),
        }
    }

    /// The demo table knows its leasers; the remote service is only addressed by id.
    pub(crate) fn leaser(&self, id: &str) -> SuspectLeaser {
        let known = match self {
            Backend::Demo(backend) => backend.leaser(id),
            Backend::Remote(_) => None,
        };
        known.unwrap_or_else(|| SuspectLeaser {
            id: id.to_string(),
            name: id.to_string(),
            email: None,
            phone: None,
            addresses: Vec::new(),
            flags: Vec::new(),
            reported_count: 0,
            created_at: None,
        })
    }
}

pub(crate) async fn read_documents(paths: &[PathBuf]) -> Result<Vec<DocumentBlob>, AppError> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(DocumentBlob::read(path).await?);
    }
    Ok(documents)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(std::io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}

/// Logs each new upload stage until cancelled.
pub(crate) fn log_submission_progress(
    mut updates: watch::Receiver<SubmissionState>,
) -> ScheduledTask {
    ScheduledTask::spawn(async move {
        let mut last_stage = None;
        while updates.changed().await.is_ok() {
            if let SubmissionState::Uploading { progress, stage } = &*updates.borrow_and_update()
            {
                if last_stage != Some(*stage) {
                    info!(progress, stage = stage.label(), "analysis in progress");
                    last_stage = Some(*stage);
                }
            }
        }
    })
}

/// Logs each verification step as it is appended.
pub(crate) fn log_verification_steps(
    mut updates: watch::Receiver<ReportFlowState>,
) -> ScheduledTask {
    ScheduledTask::spawn(async move {
        let mut logged = 0;
        while updates.changed().await.is_ok() {
            if let Some(verification) = updates.borrow_and_update().verification() {
                for step in verification.log.iter().skip(logged) {
                    info!(progress = verification.progress, step = step.label(), "verifying report");
                }
                logged = verification.log.len();
            }
        }
    })
}

use crate::infra::{
    log_submission_progress, log_verification_steps, print_json, read_documents, Backend,
};
use clap::Args;
use rentguard::config::PacingConfig;
use rentguard::error::AppError;
use rentguard::remote::{check_connectivity, search_suspect_leasers, SuspectLeaserQuery};
use rentguard::workflows::reporting::ReportFlow;
use rentguard::workflows::screening::{
    compute_display_metrics, AnalysisResult, DisplayMetrics, Language, SubmissionController,
};
use rentguard::workflows::DocumentBlob;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct AnalyzeArgs {
    /// Lease documents to upload (PDF, DOCX, TXT, images)
    pub(crate) files: Vec<PathBuf>,
    /// Listing URL to analyze alongside or instead of documents
    #[arg(long)]
    pub(crate) url: Option<String>,
    /// Property address to analyze alongside or instead of documents
    #[arg(long)]
    pub(crate) address: Option<String>,
    /// Output language for the explanation
    #[arg(long, default_value = "english", value_parser = parse_language)]
    pub(crate) language: Language,
    /// Request a voice rendering of the explanation
    #[arg(long)]
    pub(crate) voice: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Identifier of the suspect leaser to report
    pub(crate) leaser_id: String,
    /// Evidence files supporting the report
    #[arg(long = "evidence", required = true, num_args = 1..)]
    pub(crate) evidence: Vec<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SearchArgs {
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) email: Option<String>,
    #[arg(long)]
    pub(crate) phone: Option<String>,
    #[arg(long)]
    pub(crate) address: Option<String>,
    #[arg(long, default_value = "english", value_parser = parse_language)]
    pub(crate) language: Language,
}

pub(crate) fn parse_language(raw: &str) -> Result<Language, String> {
    raw.parse()
}

/// Settled analysis as printed on stdout.
#[derive(Debug, Serialize)]
pub(crate) struct AnalysisReport {
    pub(crate) metrics: DisplayMetrics,
    pub(crate) result: AnalysisResult,
}

pub(crate) async fn analyze(
    backend: &Backend,
    pacing: PacingConfig,
    args: AnalyzeArgs,
) -> Result<(), AppError> {
    let documents = read_documents(&args.files).await?;
    let report = run_analysis(backend, pacing, documents, args).await?;
    print_json(&report)
}

pub(crate) async fn run_analysis(
    backend: &Backend,
    pacing: PacingConfig,
    documents: Vec<DocumentBlob>,
    args: AnalyzeArgs,
) -> Result<AnalysisReport, AppError> {
    let controller = SubmissionController::new(backend.shared(), pacing);
    controller.select_files(documents)?;
    controller.set_listing_url(args.url)?;
    controller.set_address(args.address)?;

    let progress = log_submission_progress(controller.subscribe());
    let outcome = controller.submit(args.language, args.voice).await;
    progress.cancel().await;

    let result = outcome?;
    let metrics = compute_display_metrics(&result);
    info!(
        score = metrics.score,
        grade = metrics.grade.label(),
        risk_level = metrics.risk_level.label(),
        "analysis ready"
    );
    Ok(AnalysisReport { metrics, result })
}

pub(crate) async fn report(
    backend: &Backend,
    pacing: PacingConfig,
    args: ReportArgs,
) -> Result<(), AppError> {
    let evidence = read_documents(&args.evidence).await?;
    let flow = ReportFlow::new(backend.shared(), backend.leaser(&args.leaser_id), pacing);
    flow.add_evidence(evidence)?;

    let steps = log_verification_steps(flow.subscribe());
    let outcome = flow.advance().await;
    steps.cancel().await;

    let receipt = outcome?;
    print_json(&receipt)
}

pub(crate) async fn search(backend: &Backend, args: SearchArgs) -> Result<(), AppError> {
    let query = SuspectLeaserQuery {
        name: args.name,
        email: args.email,
        phone: args.phone,
        address: args.address,
        language: args.language,
    };
    let leasers = search_suspect_leasers(backend.shared().as_ref(), &query).await?;
    info!(matches = leasers.len(), "suspect leaser search finished");
    print_json(&leasers)
}

pub(crate) async fn health(backend: &Backend) -> Result<(), AppError> {
    let connectivity = check_connectivity(backend.shared().as_ref()).await;
    print_json(&connectivity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentguard::workflows::screening::{RiskLevel, ScoreSource};
    use std::time::Duration;

    fn quick_pacing() -> PacingConfig {
        PacingConfig {
            progress_tick: Duration::from_millis(5),
            report_step_interval: Duration::from_millis(1),
            report_settle: Duration::from_millis(1),
        }
    }

    #[test]
    fn language_flag_accepts_any_case() {
        assert_eq!(parse_language("Bengali"), Ok(Language::Bengali));
        assert!(parse_language("latin").is_err());
    }

    #[tokio::test]
    async fn demo_analysis_reports_authoritative_metrics() {
        let backend = Backend::demo();
        let args = AnalyzeArgs {
            address: Some("789 Phishing Lane".to_string()),
            ..AnalyzeArgs::default()
        };

        let report = run_analysis(&backend, quick_pacing(), Vec::new(), args)
            .await
            .expect("demo analysis succeeds");
        assert_eq!(report.metrics.source, ScoreSource::Authoritative);
        assert_eq!(report.metrics.risk_level, RiskLevel::HighRisk);
        assert!(report.result.concerning_clause_count() > 0);
    }

    #[tokio::test]
    async fn analysis_without_input_is_a_usage_error() {
        let backend = Backend::demo();
        let err = run_analysis(&backend, quick_pacing(), Vec::new(), AnalyzeArgs::default())
            .await
            .expect_err("nothing to analyze");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn unknown_leaser_gets_a_placeholder_and_a_remote_error() {
        let backend = Backend::demo();
        let leaser = backend.leaser("missing-leaser");
        assert_eq!(leaser.name, "missing-leaser");
        assert_eq!(leaser.reported_count, 0);

        let flow = ReportFlow::new(backend.shared(), leaser, quick_pacing());
        flow.add_evidence([DocumentBlob::new("chat.png", b"proof".to_vec())])
            .expect("collecting");
        let err = AppError::from(flow.advance().await.expect_err("leaser is unknown"));
        assert_eq!(err.exit_code(), 1);
    }
}

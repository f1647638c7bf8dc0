use crate::commands::{run_analysis, AnalyzeArgs};
use crate::infra::{log_verification_steps, print_json, Backend};
use clap::Args;
use rentguard::config::PacingConfig;
use rentguard::error::AppError;
use rentguard::remote::{search_suspect_leasers, SuspectLeaserQuery};
use rentguard::workflows::reporting::ReportFlow;
use rentguard::workflows::DocumentBlob;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

const SAMPLE_LEASE: &str = "\
RESIDENTIAL LEASE AGREEMENT
1. Tenant shall pay a non-refundable application fee of $500 via wire transfer within 24 hours.
2. Landlord may enter premises at any time without prior notice.
3. Late payment of rent shall incur a fee of 15% of monthly rent plus $50 per day.
";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Shorten simulated progress and verification delays to a few milliseconds each.
    #[arg(long)]
    pub(crate) fast: bool,
    /// Skip reporting the sample suspect leaser.
    #[arg(long)]
    pub(crate) skip_report: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    score: u8,
    grade: &'static str,
    risk_level: &'static str,
    concerning_clauses: usize,
    suspect_leaser: Option<String>,
    reported_count: Option<u64>,
}

pub(crate) async fn run_demo(args: DemoArgs, pacing: PacingConfig) -> Result<(), AppError> {
    let pacing = if args.fast {
        PacingConfig {
            progress_tick: Duration::from_millis(20),
            report_step_interval: Duration::from_millis(20),
            report_settle: Duration::from_millis(10),
        }
    } else {
        pacing
    };

    let backend = Backend::demo();

    let analysis = run_analysis(
        &backend,
        pacing,
        vec![DocumentBlob::new("sample-lease.txt", SAMPLE_LEASE.as_bytes().to_vec())],
        AnalyzeArgs::default(),
    )
    .await?;

    let mut summary = DemoSummary {
        score: analysis.metrics.score,
        grade: analysis.metrics.grade.label(),
        risk_level: analysis.metrics.risk_level.label(),
        concerning_clauses: analysis.result.concerning_clause_count(),
        suspect_leaser: None,
        reported_count: None,
    };

    let query = SuspectLeaserQuery {
        name: Some("john".to_string()),
        ..SuspectLeaserQuery::default()
    };
    let matches = search_suspect_leasers(backend.shared().as_ref(), &query).await?;

    if let Some(leaser) = matches.into_iter().next() {
        summary.suspect_leaser = Some(leaser.name.clone());
        if !args.skip_report {
            let flow = ReportFlow::new(backend.shared(), leaser, pacing);
            flow.add_evidence([DocumentBlob::new(
                "chat-screenshot.txt",
                b"Landlord: wire the deposit today or lose the unit.".to_vec(),
            )])?;

            let steps = log_verification_steps(flow.subscribe());
            let outcome = flow.advance().await;
            steps.cancel().await;
            summary.reported_count = Some(outcome?.reported_count);
        }
    }

    info!(score = summary.score, "demo complete");
    print_json(&summary)
}

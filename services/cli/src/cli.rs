use crate::commands::{self, AnalyzeArgs, ReportArgs, SearchArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::infra::Backend;
use clap::{Parser, Subcommand};
use rentguard::config::{AppConfig, RemoteConfig};
use rentguard::error::AppError;
use rentguard::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "RentGuard",
    about = "Screen rental listings and lease documents for fraud from the command line",
    version
)]
struct Cli {
    /// Serve built-in sample results instead of calling the analysis service
    #[arg(long, global = true)]
    demo: bool,
    /// Override the configured analysis service base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze lease documents, a listing URL, or an address
    Analyze(AnalyzeArgs),
    /// Verify evidence and report a suspect leaser
    Report(ReportArgs),
    /// Look up suspect leasers by name, email, phone, or address
    Search(SearchArgs),
    /// Check whether the analysis service is reachable
    Health,
    /// Walk through screening, search, and reporting with the demo backend
    Demo(DemoArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.remote = RemoteConfig::from_base_url(base_url)?;
    }

    telemetry::init(&config.telemetry)?;
    debug!(
        environment = ?config.environment,
        base_url = %config.remote.base_url,
        "configuration loaded"
    );

    let connect = || Backend::connect(&config.remote, cli.demo);
    match cli.command {
        Command::Analyze(args) => commands::analyze(&connect()?, config.pacing, args).await,
        Command::Report(args) => commands::report(&connect()?, config.pacing, args).await,
        Command::Search(args) => commands::search(&connect()?, args).await,
        Command::Health => commands::health(&connect()?).await,
        Command::Demo(args) => run_demo(args, config.pacing).await,
    }
}

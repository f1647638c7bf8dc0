mod cli;
mod commands;
mod demo;
mod infra;

use rentguard::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

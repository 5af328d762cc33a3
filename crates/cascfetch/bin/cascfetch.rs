//! cascfetch binary entry point.
//!
//! Parses settings, initialises logging, builds the client and fetches each
//! identifier/destination pair. Exits with status 1 when any pair failed.

use std::process::ExitCode;

use anyhow::{Context, Result};
use cascfetch::{Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = ClientConfig::from_args();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    config.validate()?;
    tracing::info!(
        "Fetching {} files for {} {} ({})",
        config.requests().len(),
        config.program,
        config.region,
        config.locale
    );

    let client = Client::open(&config)
        .await
        .context("Failed to initialise client")?;

    let mut failed = 0usize;
    for (identifier, destination) in config.requests() {
        let outcome = client.fetch(&identifier, &destination).await;
        println!("{identifier} -> {}: {outcome}", destination.display());
        if !outcome.is_success() {
            failed += 1;
        }
    }

    if failed > 0 {
        tracing::warn!("{} of {} files unavailable", failed, config.requests().len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

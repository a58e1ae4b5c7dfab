use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use sift::app::{Cli, build_mode, process_records};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let mode = Arc::new(build_mode(&cli)?);

    let start = std::time::Instant::now();
    let (read_count, match_count) = process_records(&cli, mode)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Matched {} of {} records in {:.2}s",
        match_count,
        read_count,
        elapsed.as_secs_f64()
    );

    Ok(())
}

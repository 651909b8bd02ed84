mod args;

use anyhow::Context;
use args::Args;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse()
        .into_config()
        .context("Invalid configuration")?;

    let report = imap_archiver::archive::run(&config)
        .with_context(|| format!("Failed to archive mail on {}", config.host))?;

    if report.selected == 0 {
        println!("No emails to archive");
    } else {
        println!("{} emails moved to {}", report.archived, report.destination);
    }
    Ok(())
}

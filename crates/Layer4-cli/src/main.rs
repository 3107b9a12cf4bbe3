//! Reel CLI - Main entry point

mod cli;
mod commands;
mod host;

use clap::Parser;
use cli::Args;
use host::Host;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, stdout is reserved for JSON output)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = Host::load_config(args.home)?;
    tracing::debug!("Host home: {}", config.home.display());

    let (host, _startup) = Host::boot(config).await?;
    let outcome = commands::execute(&host.lifecycle, &host.auth, args.command).await?;

    println!("{}", serde_json::to_string_pretty(&outcome.value)?);
    if !outcome.success {
        std::process::exit(1);
    }

    Ok(())
}

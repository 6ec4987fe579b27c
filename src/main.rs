// src/main.rs
use clap::Parser;
use ct_backscan::api;
use ct_backscan::cli::Cli;
use ct_backscan::config::Config;
use ct_backscan::scan::{SanExtractor, ScanEngine, X509Decoder};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    cli.validate()?;

    // Load config file
    let config = Config::from_file(Path::new(&cli.config))?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        &config.logging.level
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    tracing::info!("Starting ct-backscan...");

    let sources = config.all_sources();
    tracing::info!(
        "Loaded registry: {} providers, {} logs",
        config.providers.len(),
        sources.len()
    );

    // The engine receives the already-validated registry; no global accessor
    let engine = Arc::new(ScanEngine::new(
        config.scan.clone(),
        sources,
        Arc::new(X509Decoder),
        Arc::new(SanExtractor),
    )?);

    let app = api::router(engine);

    let listen_addr = cli
        .listen
        .unwrap_or_else(|| config.server.listen_addr.clone());

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Server running on http://{}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use snip_gateway::auth::Signer;
use snip_gateway::cli::CLI;
use snip_gateway::worker::{self, DeletePoolConfig};
use snip_gateway::{App, AppState};
use snip_generator::RandomGenerator;
use snip_shortener::ShortenerService;
use snip_storage::{Repository, Storage};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    snip_telemetry::init(config.log_format, snip_telemetry::DEFAULT_DIRECTIVE)?;

    let (secret, fallback) = config.secret();
    if fallback {
        warn!("no signing secret configured, using the built-in default");
    }

    let storage = Arc::new(Storage::open(&config.storage_settings()).await);

    let (deletes, workers) = worker::spawn(
        Arc::clone(&storage),
        DeletePoolConfig::builder()
            .workers(config.delete_workers)
            .queue_capacity(config.delete_queue_capacity)
            .build(),
    );

    let shortener =
        ShortenerService::from_shared(Arc::clone(&storage), Arc::new(RandomGenerator::new()));
    let state = AppState::new(
        shortener,
        Signer::new(secret)?,
        deletes,
        config.base_url(),
    );

    let listener = TcpListener::bind(config.listen_address())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address()))?;

    info!(
        listen_addr = %listener.local_addr()?,
        storage = %storage.storage_type(),
        base_url = config.base_url().as_deref().unwrap_or("<host>"),
        delete_workers = config.delete_workers,
        "starting gateway server"
    );

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workers.join().await;

    if let Err(err) = storage.save_to_file().await {
        error!(error = %err, "failed to save url snapshot");
    }

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

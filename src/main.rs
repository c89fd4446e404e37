//! Lectern Server - library loan management
//!
//! Serves the REST API and runs the background job worker and the overdue
//! sweep schedule in the same process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lectern_server::{
    api,
    config::{AppConfig, LoggingConfig},
    jobs::{redis::RedisJobQueue, scheduler::run_sweep_schedule, JobQueue},
    repository::{LedgerStore, Repository},
    services::{clock::SystemClock, email::SmtpMailer, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Lectern Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let queue = RedisJobQueue::new(&config.redis.url, &config.redis.queue_prefix)
        .await
        .context("Failed to connect to Redis")?;
    let recovered = queue.recover_in_flight().await?;
    tracing::info!(recovered, "Connected to Redis job queue");

    let repository = Repository::new(pool);
    let ledger_store: Arc<dyn LedgerStore> = Arc::new(repository.loans.clone());
    let jobs: Arc<dyn JobQueue> = Arc::new(queue);
    let services = Services::new(
        repository,
        ledger_store,
        Arc::new(SmtpMailer::new(config.email.clone())),
        jobs.clone(),
        Arc::new(SystemClock),
        &config.loans,
    );

    // Background tasks stop when the sender flips to true
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(services.job_worker(&config.jobs).run(shutdown_rx.clone()));
    let sweep_period = Duration::from_secs(config.jobs.sweep_interval_hours.max(1) * 3600);
    let schedule = tokio::spawn(run_sweep_schedule(jobs, sweep_period, shutdown_rx));

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    let (worker_result, schedule_result) = tokio::join!(worker, schedule);
    if let Err(e) = worker_result {
        tracing::error!(error = %e, "Job worker task failed");
    }
    if let Err(e) = schedule_result {
        tracing::error!(error = %e, "Sweep schedule task failed");
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Console output in `pretty` or `json` format, plus a daily rolling JSON file
/// when a log directory is configured.
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lectern_server={},tower_http=debug", config.level).into());

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "lectern.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if config.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

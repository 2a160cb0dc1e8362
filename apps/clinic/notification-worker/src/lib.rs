//! Notification worker.
//!
//! Drains the `notifications` stream (group `notification_workers`) and
//! delivers registration confirmations. Email goes out over SMTP; SMS jobs
//! fail until a provider exists. Every job gets one attempt.

mod config;

pub use config::WorkerSettings;

use core_config::{Environment, FromEnv, app_info};
use database::common::RetryConfig;
use database::redis::{RedisConfig, connect_from_config_with_retry};
use domain_notifications::{
    ConfirmationMailer, EmailProvider, JobHandlers, JobType, NotificationJob,
    NotificationProcessor, NotificationStream, SmtpConfig, SmtpProvider, UnavailableSmsChannel,
};
use eyre::{Result, WrapErr};
use stream_worker::{
    HealthState, StreamConsumer, StreamWorker, WorkerConfig, health_router, metrics,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

async fn start_health_server(state: HealthState, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port, "Health server listening");

    axum::serve(listener, health_router(state))
        .await
        .wrap_err("Health server failed")
}

/// Runs until Ctrl-C or SIGTERM, then drains in-flight jobs.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics().wrap_err("Failed to install metrics recorder")?;

    let app = app_info!();
    info!(name = %app.name, version = %app.version, environment = ?environment, "Starting notification worker");

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker settings")?;

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    info!("Connecting to Redis...");
    let redis = connect_from_config_with_retry(
        redis_config,
        Some(RetryConfig::new().with_max_retries(5).with_max_delay(10_000)),
    )
    .await
    .wrap_err("Failed to connect to Redis")?;
    info!("Connected to Redis");

    let smtp_config = SmtpConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
    info!(host = %smtp_config.host, port = smtp_config.port, tls = smtp_config.use_tls, "SMTP configured");
    let provider = SmtpProvider::new(smtp_config).wrap_err("Failed to build SMTP transport")?;
    if let Err(e) = provider.health_check().await {
        // Jobs will fail individually until the server is reachable.
        warn!(error = %e, "SMTP server not reachable at startup");
    }

    let handlers = JobHandlers::builder()
        .email(ConfirmationMailer::new(provider))
        .sms(UnavailableSmsChannel)
        .build()
        .wrap_err("Incomplete job handler table")?;
    let job_types: Vec<&str> = JobType::all().map(JobType::as_str).collect();
    info!(?job_types, "Job handlers registered");

    let worker_config = WorkerConfig::from_stream_def::<NotificationStream>();
    info!(
        stream = %worker_config.stream_name,
        group = %worker_config.consumer_group,
        consumer = %worker_config.consumer_name,
        max_concurrent_jobs = worker_config.max_concurrent_jobs,
        "Worker configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let health_state = HealthState::new(
        redis.clone(),
        app.name,
        app.version,
        worker_config.stream_name.clone(),
        worker_config.consumer_group.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, settings.health_port).await {
            error!(error = %e, "Health server stopped");
        }
    });

    let consumer = StreamConsumer::new(redis, worker_config.clone());
    let worker = StreamWorker::<NotificationJob, _, _>::new(
        consumer,
        NotificationProcessor::new(handlers),
        worker_config,
    );

    worker.run(shutdown_rx).await.wrap_err("Worker stopped with an error")?;

    info!("Notification worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

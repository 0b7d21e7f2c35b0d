// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, sync::Arc, time::Duration};

use client_registry::{
    api::router,
    auth::{credentials, Clock, SystemClock, TokenCodec},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::Database,
    tasks::TaskQueue,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long background workers get to exit after the server stops.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format)?;

    let db = Arc::new(match config.database_path() {
        Some(path) => {
            info!(path = %path.display(), "opening database");
            Database::open(&path)?
        }
        None => {
            warn!("DATA_DIR not set, using an in-memory database");
            Database::in_memory()?
        }
    });

    if let Some(seed) = config.seed_admin.clone() {
        let seed_db = db.clone();
        let created = tokio::task::spawn_blocking(move || {
            credentials::ensure_admin(&seed_db, &seed.username, &seed.email, &seed.password)
        })
        .await??;
        if created {
            info!("bootstrap administrator created");
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = TokenCodec::new(&config.jwt, clock.clone())?;

    let shutdown = CancellationToken::new();
    let (tasks, workers) = TaskQueue::start(db.clone(), clock.clone(), shutdown.clone());

    let app = router(AppState::new(tokens, db, clock, tasks));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "client registry listening");
    info!("Swagger UI available at http://{addr}/swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let drained = tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, async {
        for worker in workers {
            let _ = worker.await;
        }
    })
    .await;
    if drained.is_err() {
        warn!("task workers did not stop in time");
    }

    info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init()?,
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}

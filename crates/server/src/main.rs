use std::future::IntoFuture;

use anyhow::Error as AnyhowError;
use config::{ConfigError, ServerConfig};
use db::{DBService, DbErr};
use insights::InsightsService;
use server::{AppState, http};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils_jwt::TokenService;

const GRACEFUL_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const CLEANUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TicklistError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), TicklistError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},db={level},tasks={level},config={level},insights={level},utils_jwt={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = ServerConfig::load()?;

    let db = DBService::connect(&config.database_url).await?;
    let tokens = TokenService::new(config.token_secret.as_bytes());
    let insights = InsightsService::new(
        config.insights.api_key.clone(),
        config.insights.base_url.clone(),
        config.insights.model.clone(),
    );
    let state = AppState::new(db, tokens, insights);

    let app_router = http::router(state.clone());

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{}:{actual_port}", config.host);

    let signals = spawn_signal_listener();

    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(nth_signal(signals.clone(), 1))
        .into_future();
    tokio::pin!(server);

    let drain_deadline = {
        let signals = signals.clone();
        async move {
            nth_signal(signals, 1).await;
            tokio::time::sleep(GRACEFUL_SHUTDOWN_TIMEOUT).await;
        }
    };

    tokio::select! {
        res = &mut server => res?,
        _ = nth_signal(signals.clone(), 2) => {
            tracing::warn!("Second shutdown signal received, exiting immediately");
            std::process::exit(130);
        }
        _ = drain_deadline => {
            tracing::warn!(
                "Still draining connections after {GRACEFUL_SHUTDOWN_TIMEOUT:?}, exiting immediately"
            );
            std::process::exit(130);
        }
    }

    tokio::select! {
        _ = close_database(&state) => {}
        _ = nth_signal(signals.clone(), 2) => {
            tracing::warn!("Second shutdown signal received during cleanup, exiting immediately");
            std::process::exit(130);
        }
        _ = tokio::time::sleep(CLEANUP_TIMEOUT) => {
            tracing::warn!("Cleanup timed out after {CLEANUP_TIMEOUT:?}, exiting immediately");
            std::process::exit(130);
        }
    }

    if *signals.borrow() > 0 {
        std::process::exit(0);
    }

    Ok(())
}

async fn close_database(state: &AppState) {
    if let Err(e) = state.db().clone().close().await {
        tracing::warn!("Failed to cleanly close the database: {e}");
    }
}

/// Counts SIGINT/SIGTERM deliveries into a watch channel. The first signal
/// starts the graceful drain, the second forces exit; the listener stops
/// after that.
fn spawn_signal_listener() -> watch::Receiver<u32> {
    let (tx, rx) = watch::channel(0u32);

    tokio::spawn(async move {
        #[cfg(unix)]
        let (mut sigint, mut sigterm) = {
            use tokio::signal::unix::{SignalKind, signal};

            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(int), Ok(term)) => (int, term),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to install signal handlers: {e}");
                    return;
                }
            }
        };

        loop {
            #[cfg(unix)]
            tokio::select! {
                _ = sigint.recv() => {},
                _ = sigterm.recv() => {},
            }

            #[cfg(not(unix))]
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                return;
            }

            tx.send_modify(|count| *count += 1);
            match *tx.borrow() {
                1 => tracing::info!(
                    "Shutdown signal received, starting graceful shutdown (press Ctrl+C again to force)"
                ),
                _ => {
                    tracing::warn!("Second shutdown signal received, forcing exit");
                    return;
                }
            }
        }
    });

    rx
}

/// Resolves once at least `n` termination signals have arrived. Pends
/// forever if the listener is gone before that many were seen.
async fn nth_signal(mut rx: watch::Receiver<u32>, n: u32) {
    if rx.wait_for(|count| *count >= n).await.is_err() {
        std::future::pending::<()>().await;
    }
}

//! appshell server.
//!
//! Hosts two independent surfaces on one listener:
//! - `POST /deleteUserByUid`: callable endpoint removing a user's profile
//!   document and identity
//! - every other request: offline-first proxy to the web app origin, answered
//!   from the install-time cache, the network, or the cached start page
//!
//! The offline cache is installed in the background at startup. Until it
//! finishes, requests still go through the same resolution chain against
//! whatever the cache holds.

pub mod callable;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::post, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use appshell_core::offline::AssetList;
use appshell_core::Config;

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/deleteUserByUid", post(callable::delete_user_by_uid))
        .fallback(proxy::intercept)
        .with_state(state)
}

/// Install the offline cache without holding up request handling
pub fn spawn_install(state: Arc<AppState>, assets: AssetList) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = state.offline.install(&assets).await {
            // Retried on next start, like a worker that failed to register
            error!(error = %e, "Offline cache install failed");
        }
    })
}

pub async fn serve(config: Config) -> Result<()> {
    info!("Initializing state...");
    let state = AppState::from_config(&config)?;

    let assets = match state::manifest_assets(&config) {
        Ok(assets) => assets,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable asset manifest");
            AssetList::default()
        }
    };
    spawn_install(state.clone(), assets);

    let app = router(state);

    info!(address = %config.bind, "Binding");
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(address = %config.bind, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

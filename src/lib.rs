//! Photo gallery web service.
//!
//! Visitors browse, search, like and comment on images. Admins log in to
//! upload JPEGs, delete images and manage the list of uploader emails.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;
pub mod state;
pub mod storage;
pub mod validation;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{info, warn};

pub use config::Config;
pub use http::build_router;
pub use state::AppState;

/// Open the stores, bind the listener and serve until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let address = config.listen_addr();
    let state = tokio::task::spawn_blocking(move || AppState::open(config))
        .await
        .context("Startup task failed")??;

    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Gallery running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gallery shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (config watcher, metrics, admin API)
//! - Bind listeners and begin accepting traffic
//! - Wire OS signals to the shutdown broadcast

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::watcher::ConfigWatcher;
use crate::config::ThrottleConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::metrics;
use crate::store::{build_store, ReadPolicy, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

/// Run the throttle until SIGINT or SIGTERM.
///
/// With `config_path` set, edits to that file are hot-reloaded.
pub async fn run(config: ThrottleConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    let store = build_store(&config.store)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone(), store);

    if config.admin.enabled {
        let admin_listener = bind(&config.admin.bind_address).await?;
        let admin_state = AdminState {
            throttle: server.throttle(),
            api_key: config.admin.api_key.clone(),
            read_policy: ReadPolicy::from(&config.store),
        };
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            let served = axum::serve(admin_listener, setup_admin_router(admin_state))
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    // The watcher stops delivering events once dropped.
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(guard) => (Some(guard), updates),
                Err(e) => {
                    tracing::error!(error = %e, path = ?path, "Config watcher failed to start, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server
        .run(listener, config_updates, server_shutdown)
        .await
        .map_err(StartupError::Serve)
}

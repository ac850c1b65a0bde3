//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics endpoint when enabled
//! - Bind the listener
//! - Start the config watcher and reload task when watching
//! - Serve until shutdown, then stop background tasks
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ConfigWatcher;
use crate::http::MockServer;
use crate::lifecycle::reload::spawn_reload_task;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

/// Fatal errors before the server accepts traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// How to run a built server.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Resolved config file; required for watching.
    pub config_path: Option<PathBuf>,
    pub watch: bool,
}

/// Run `server` until `shutdown` fires.
pub async fn start(
    server: MockServer,
    options: StartupOptions,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let config = server.config().clone();

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let address = config.server.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    // The watcher handle must outlive the server.
    let (_watcher, reload_task) = match (&options.config_path, options.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let task = spawn_reload_task(updates, server.rule_set(), config.clone(), &shutdown);
            (Some(handle), Some(task))
        }
        (None, true) => {
            tracing::warn!("Watch requested without a config file, ignoring");
            (None, None)
        }
        _ => (None, None),
    };

    let result = server.run(listener, &shutdown).await;

    shutdown.trigger();
    if let Some(task) = reload_task {
        let _ = task.await;
    }

    result.map_err(StartupError::from)
}

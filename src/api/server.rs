use crate::api::routes;
use crate::config::ServiceConfig;
use crate::core::TaskEngine;
use crate::errors::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Starts and runs the HTTP server until Ctrl-C or SIGTERM.
///
/// After the listener stops, pending task store writes are flushed so the
/// last mutations reach disk before the process exits.
///
/// # Arguments
/// * `engine` - Task engine backing every handler
/// * `config` - Resolved service configuration (port, CORS)
///
/// # Returns
/// * `Result<(), Error>` - Error if the listener cannot be bound or the server fails
pub async fn launch_server(engine: Arc<TaskEngine>, config: &ServiceConfig) -> Result<(), Error> {
    let app = routes::app(Arc::clone(&engine), config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, environment = %config.environment, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Flushing task store");
    engine.store().flush().await;
    info!("Server stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}

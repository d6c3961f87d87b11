//! API server.
//!
//! Assembles the middleware stack and serves until shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::ServerConfig;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// HTTP/WebSocket server hosting all games.
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Serve until ctrl-c / SIGTERM.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_app();
        let addr = self.socket_addr()?;

        info!("fairhouse listening on http://{}", addr);
        info!("   GET  /health              - liveness");
        info!("   GET  /api/seed            - coinflip commitment");
        info!("   POST /api/flip            - play coinflip");
        info!("   POST /api/mines/play      - reveal a mines cell");
        info!("   POST /api/mines/cashout   - cash a mines game out");
        info!("   GET  /api/mines/verify/:id - mines fairness proof");
        info!("   GET  /crash/history       - finished crash rounds");
        info!("   GET  /crash/verify/:id    - crash fairness proof");
        info!("   GET  /ws                  - live crash rounds");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped gracefully");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        create_router(self.state.clone())
            // Request ID middleware (first, so tracing sees it)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.cors_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received ctrl-c");
        },
        _ = terminate => {
            info!("received terminate signal");
        },
    }
}

//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers::{chat::chat, health::health_check};
use crate::services::providers::{GeminiTransport, UpstreamTransport};
use crate::services::RelayService;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id::{make_request_span, request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub relay: Arc<RelayService>,
}

impl AppState {
    pub fn new(config: RelayConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        let relay = Arc::new(RelayService::new(&config.gemini, transport));
        Self { config, relay }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        // Credentials stay disallowed; wildcard origins require that anyway.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini HTTP transport.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let transport: Arc<dyn UpstreamTransport> = Arc::new(GeminiTransport::new(&config.gemini)?);

        tracing::info!(
            model = %config.gemini.model,
            api_key_configured = config.gemini.api_key.is_some(),
            "Initialized Gemini transport"
        );

        Self::build_with_transport(config, transport).await
    }

    /// Build the application around an arbitrary transport.
    pub async fn build_with_transport(
        config: RelayConfig,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Result<Self, AppError> {
        // Port 0 binds a random port for testing
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Relay service listening on port {}", port);

        let router = build_router(AppState::new(config, transport));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

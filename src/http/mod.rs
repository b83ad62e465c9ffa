//! HTTP transport.
//!
//! ```text
//! POST {endpoint}                   single invocation or batch (JSON / MessagePack)
//! GET  {endpoint}/{path}?input=…    single invocation (JSON)
//! GET  /health                      liveness
//! ```
//!
//! One request creates one [`Context`](crate::context::Context); every
//! invocation of a batch gets a copy of it.

mod credentials;
mod handlers;

pub use credentials::{from_headers as credentials_from_headers, SESSION_COOKIES};

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::context::ContextProvider;
use crate::dispatch::Dispatcher;

/// Errors that stop the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    provider: ContextProvider,
    max_batch_size: usize,
}

/// Build the axum router.
pub fn router(
    config: &ServerConfig,
    dispatcher: Arc<Dispatcher>,
    provider: ContextProvider,
) -> Result<axum::Router, ServerError> {
    config.validate()?;

    let state = AppState {
        dispatcher,
        provider,
        max_batch_size: config.max_batch_size,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = axum::Router::new()
        .route(&config.endpoint, post(handlers::rpc_post))
        .route(&format!("{}/{{path}}", config.endpoint), get(handlers::rpc_get))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    provider: ContextProvider,
) -> Result<(), ServerError> {
    let app = router(&config, dispatcher, provider)?;

    let address = config.address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}{}", config.endpoint);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
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

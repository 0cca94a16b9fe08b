//! Read-only HTTP status API.
//!
//! Exposes the controller's connection state, its last decision and a
//! snapshot of the compositor state cache.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::services::RemoteStateCache;
use crate::state::ControllerState;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Connection state and last decision of the controller.
    pub controller_state: Arc<ControllerState>,
    /// Last-known compositor state.
    pub cache: Arc<RemoteStateCache>,
}

/// Starts the status server on `port` and serves until `cancel` fires.
pub async fn start_server(
    state: AppState,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state, cancel).await
}

/// Serves the status API on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    log::info!("[Server] Status API listening on http://{}", listener.local_addr()?);
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

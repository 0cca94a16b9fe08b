//! Centralized error types for the Scene Music core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types per remote boundary using `thiserror`
//! - Classifies errors that deserve a retry or a quiet log line
//! - Maps application errors to HTTP status codes for the status API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and API responses.
    fn code(&self) -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// OBS websocket errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while talking to OBS over its websocket.
#[derive(Debug, Error)]
pub enum ObsError {
    /// No identified websocket session is available.
    #[error("Not connected to OBS")]
    NotConnected,

    /// Transport-level websocket failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The Hello/Identify exchange did not complete.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// OBS answered a request with a failed status.
    #[error("Request {request_type} failed ({code}): {comment}")]
    RequestFailed {
        request_type: String,
        code: u16,
        comment: String,
    },

    /// No response arrived within the websocket timeout.
    #[error("Request {0} timed out")]
    Timeout(String),

    /// A response could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ErrorCode for ObsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "obs_not_connected",
            Self::WebSocket(_) => "obs_websocket_error",
            Self::Handshake(_) => "obs_handshake_failed",
            Self::RequestFailed { .. } => "obs_request_failed",
            Self::Timeout(_) => "obs_request_timeout",
            Self::InvalidResponse(_) => "obs_invalid_response",
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ObsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

impl ObsError {
    /// Returns true if the session went away under the request.
    ///
    /// The connection loop re-syncs after reconnecting, so callers can treat
    /// these as non-fatal.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::NotConnected | Self::WebSocket(_))
    }
}

/// Convenient Result alias for OBS operations.
pub type ObsResult<T> = Result<T, ObsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Player errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by the player control client and process lifecycle.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// HTTP request to the player failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The player answered with a non-success status code.
    #[error("HTTP error status {0}")]
    HttpStatus(u16),

    /// The control URL could not be built from the configured host and port.
    #[error("Invalid control URL: {0}")]
    InvalidUrl(String),

    /// The player process could not be started.
    #[error("Failed to start player: {0}")]
    Spawn(String),

    /// The operation was superseded by a newer request.
    #[error("Operation cancelled")]
    Cancelled,
}

impl PlayerError {
    /// Returns true if this error only means a newer request took over.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the underlying socket was reset by the player.
    ///
    /// VLC drops idle keep-alive connections, so the first request after a
    /// pause often fails this way even though the player is healthy.
    #[must_use]
    pub fn is_connection_reset(&self) -> bool {
        let Self::Http(err) = self else {
            return false;
        };
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>() {
                if io.kind() == std::io::ErrorKind::ConnectionReset {
                    return true;
                }
            }
            source = current.source();
        }
        false
    }
}

impl ErrorCode for PlayerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_) => "http_error_status",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Spawn(_) => "player_spawn_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Convenient Result alias for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Application errors
// ─────────────────────────────────────────────────────────────────────────────

/// Application-wide error type for the Scene Music service.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SceneMusicError {
    /// OBS communication failed.
    #[error("OBS error: {0}")]
    Obs(String),

    /// Player communication or process management failed.
    #[error("Player error: {0}")]
    Player(String),

    /// Server configuration error (missing or invalid settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SceneMusicError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Obs(_) => "obs_error",
            Self::Player(_) => "player_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Obs(_) | Self::Player(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type SceneMusicResult<T> = Result<T, SceneMusicError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for SceneMusicError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ObsError> for SceneMusicError {
    fn from(err: ObsError) -> Self {
        Self::Obs(err.to_string())
    }
}

impl From<PlayerError> for SceneMusicError {
    fn from(err: PlayerError) -> Self {
        Self::Player(err.to_string())
    }
}

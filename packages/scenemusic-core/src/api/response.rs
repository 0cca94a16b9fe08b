//! Response helpers shared by the handlers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

/// `200 OK` with a JSON body.
pub fn api_success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

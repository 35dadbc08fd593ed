use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::debug;

use super::error_responses::ErrorResponse;

pub async fn not_found() -> impl IntoResponse {
    debug!("router: not_found handler invoked");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            code: StatusCode::NOT_FOUND.as_u16(),
            message: "Not found".to_string(),
        }),
    )
        .into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

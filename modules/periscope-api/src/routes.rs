use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use periscope_pipeline::TriggerRequest;

use crate::AppState;

/// POST /api/research/trigger
///
/// Body is optional: `{taskId, runId}` executes that specific run; an empty
/// body selects the next due work. Input errors come back as 400; pipeline
/// failures come back inside the structured response, never as a crash.
pub async fn trigger(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = if body.is_empty() {
        TriggerRequest::default()
    } else {
        match serde_json::from_slice::<TriggerRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "error": format!("invalid payload: {e}") })),
                )
                    .into_response();
            }
        }
    };

    match state.runner.trigger(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) if e.is_input_error() => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Trigger failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

//! v1 ask handler: NDJSON-streamed answer synthesis.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use crate::api::v1::dto::AskRequest;
use crate::api::v1::response::ApiResponse;
use crate::api::AppState;
use crate::error::MagpieError;

/// `POST /api/v1/ask`
///
/// Streams `application/x-ndjson` frames: a `sources` frame first, then
/// `delta` frames as the answer is generated, and a terminal `done`
/// frame. Failures after the stream starts surface as an `error` frame,
/// never as a non-200 status.
#[utoipa::path(
    post,
    path = "/api/v1/ask",
    tag = "ask",
    operation_id = "ask.ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "NDJSON answer stream", body = String, content_type = "application/x-ndjson"),
        (status = 400, description = "Invalid request"),
    )
)]
pub async fn ask(State(state): State<AppState>, axum::Json(req): axum::Json<AskRequest>) -> Response {
    if req.q.trim().is_empty() {
        return ApiResponse::<()>::from_error(&MagpieError::Validation(
            "Question cannot be empty".to_string(),
        ))
        .into_response();
    }

    let stream = Arc::clone(&state.answer)
        .answer_stream(req.into())
        .map(|line| Ok::<_, Infallible>(Bytes::from(line)));

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}

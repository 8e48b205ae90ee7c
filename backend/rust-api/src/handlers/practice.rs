use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    handlers::error::ApiError,
    models::{
        attempt::{HintCheckRequest, SubmitAnswerRequest},
        NextQuestionRequest, StartSessionRequest,
    },
    services::{session_service::SessionService, AppState},
};

fn session_service(state: &AppState) -> SessionService {
    SessionService::new(state.stores.clone(), state.config.practice.clone())
}

/// POST /api/v1/practice/sessions
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!(
        "Starting practice session for user_id={}, mode={}",
        req.user_id,
        req.mode
    );

    let response = session_service(&state).start(req).await?;
    let status = if response.question.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// GET /api/v1/practice/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = session_service(&state).get(&session_id).await?;
    Ok(Json(summary))
}

/// DELETE /api/v1/practice/sessions/{id}
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Ending practice session: {}", session_id);
    let summary = session_service(&state).end(&session_id).await?;
    Ok(Json(summary))
}

/// POST /api/v1/practice/sessions/{id}/next
///
/// The body is optional; `{"mode": "..."}` switches the session mode.
pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: NextQuestionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        NextQuestionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::bad_request(format!("Failed to parse JSON request body: {}", e))
        })?
    };
    let response = session_service(&state).next(&session_id, req).await?;
    Ok(Json(response))
}

/// POST /api/v1/practice/sessions/{id}/answers
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!(
        "Submitting answer for session: {}, question: {}",
        session_id,
        req.question_id
    );

    let response = session_service(&state).submit(&session_id, req).await?;
    Ok(Json(response))
}

/// POST /api/v1/practice/sessions/{id}/hint-check
pub async fn hint_check(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<HintCheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let response = session_service(&state).hint_check(&session_id, req).await?;
    Ok(Json(response))
}

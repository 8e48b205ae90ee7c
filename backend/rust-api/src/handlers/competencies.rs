use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    handlers::error::ApiError,
    models::{
        competency::{CompetencyView, RecommendationsResponse},
        TOPIC_ID_RE,
    },
    services::{competency_service::CompetencyTracker, AppState},
};

fn tracker(state: &AppState) -> CompetencyTracker {
    CompetencyTracker::new(
        state.stores.competencies.clone(),
        state.stores.questions.clone(),
        state.config.practice.clone(),
    )
}

fn check_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.trim().is_empty() || user_id.len() > 128 {
        return Err(ApiError::bad_request("Invalid user_id"));
    }
    Ok(())
}

/// GET /api/v1/users/{user_id}/competencies
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_user_id(&user_id)?;
    let dashboard = tracker(&state).dashboard(&user_id).await?;
    Ok(Json(dashboard))
}

/// GET /api/v1/users/{user_id}/competencies/{topic_id}
pub async fn get_topic_competency(
    State(state): State<Arc<AppState>>,
    Path((user_id, topic_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    check_user_id(&user_id)?;
    if !TOPIC_ID_RE.is_match(&topic_id) {
        return Err(ApiError::bad_request(format!(
            "Invalid topic_id: {}",
            topic_id
        )));
    }

    let competency = tracker(&state).get(&user_id, &topic_id).await?;
    Ok(Json(CompetencyView::from(&competency)))
}

/// GET /api/v1/users/{user_id}/readiness
pub async fn get_readiness(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_user_id(&user_id)?;
    let readiness = tracker(&state).competition_readiness(&user_id).await?;
    Ok(Json(readiness))
}

/// GET /api/v1/users/{user_id}/recommendations
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_user_id(&user_id)?;
    let tracker = tracker(&state);
    let topics = tracker.recommendations(&user_id).await?;
    let weak_areas = tracker.weak_areas(&user_id).await?;

    Ok(Json(RecommendationsResponse {
        user_id,
        topics,
        weak_areas,
    }))
}

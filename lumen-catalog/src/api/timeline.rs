//! Timeline endpoints

use axum::{extract::State, Json};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use crate::api::auth::AdminUser;
use crate::db::{luminaires, timeline};
use crate::error::{ApiError, ApiResult};
use crate::periods::{build_timeline, TimelinePeriod};
use crate::AppState;

/// GET /api/timeline
pub async fn get_timeline(State(state): State<AppState>) -> ApiResult<Json<Vec<TimelinePeriod>>> {
    let all = luminaires::list_all(&state.db).await?;
    let descriptions = timeline::descriptions(&state.db).await?;
    Ok(Json(build_timeline(&all, &descriptions)))
}

/// GET /api/timeline/descriptions
pub async fn get_descriptions(State(state): State<AppState>) -> ApiResult<Json<HashMap<String, String>>> {
    Ok(Json(timeline::descriptions(&state.db).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDescriptionRequest {
    pub period_name: String,
    pub description: String,
}

/// POST /api/timeline/descriptions
pub async fn set_description(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<SetDescriptionRequest>,
) -> ApiResult<Json<HashMap<String, String>>> {
    let period_name = request.period_name.trim();
    if period_name.is_empty() {
        return Err(ApiError::BadRequest("periodName is required".to_string()));
    }

    timeline::set_description(&state.db, period_name, &request.description).await?;
    info!(by = %admin.email, "Updated description of period '{}'", period_name);

    Ok(Json(timeline::descriptions(&state.db).await?))
}

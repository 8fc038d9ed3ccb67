//! Favorites of the signed-in user

use axum::{
    extract::{Path, State},
    Json,
};
use lumen_common::Luminaire;
use serde_json::{json, Value};

use crate::api::auth::CurrentUser;
use crate::db::{favorites, luminaires};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Luminaire>>> {
    let mut items = Vec::new();
    for id in favorites::list_ids(&state.db, &user.guid).await? {
        if let Some(luminaire) = luminaires::get(&state.db, &id).await? {
            items.push(luminaire);
        }
    }
    Ok(Json(items))
}

/// POST /api/favorites/:id
///
/// Toggles the flag and reports the new state as `{"favorite": bool}`.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if luminaires::get(&state.db, &id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Luminaire {}", id)));
    }

    let favorite = favorites::toggle(&state.db, &user.guid, &id).await?;
    Ok(Json(json!({ "favorite": favorite })))
}

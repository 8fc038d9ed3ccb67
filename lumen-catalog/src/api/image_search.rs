//! Search the catalog by photo
//!
//! The image is forwarded to the external similarity API. Free accounts get
//! a fixed number of searches per UTC day. A slot is claimed before the API
//! call and given back if the API does not answer.

use axum::{
    extract::{Multipart, State},
    Json,
};
use lumen_common::api::auth::{release_search, reserve_search};
use lumen_common::time::today;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::auth::CurrentUser;
use crate::db::luminaires;
use crate::error::{ApiError, ApiResult};
use crate::services::image_search::{normalize, ImageMatch};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ImageSearchResponse {
    pub results: Vec<ImageMatch>,
    /// Searches left today, absent for unlimited accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

/// POST /api/search/image
///
/// Multipart fields: `image` (required) and `top_k`.
pub async fn search_by_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ImageSearchResponse>> {
    let client = state
        .image_search
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Image search is not configured".to_string()))?;

    let mut image: Option<(String, String, Vec<u8>)> = None;
    let mut top_k = state.config.image_search_top_k;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image.jpg").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream().to_string());
                if !content_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(format!(
                        "Expected an image, got {}",
                        content_type
                    )));
                }
                let data = field.bytes().await?;
                image = Some((file_name, content_type, data.to_vec()));
            }
            "top_k" => {
                let text = field.text().await?;
                top_k = text
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|k| *k > 0)
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid top_k: '{}'", text)))?;
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        image.ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;

    let usage = reserve_search(&state.db, &user, &today(), state.config.free_daily_searches).await?;

    let raw = match client.search(data, &file_name, &content_type, top_k).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Image search failed: {}", e);
            if let Err(release_err) = release_search(&state.db, &user.guid, &usage).await {
                warn!(user = %user.email, "Failed to release search slot: {}", release_err);
            }
            return Err(ApiError::Upstream(e.to_string()));
        }
    };

    let catalog = luminaires::list_all(&state.db).await?;
    let results: Vec<ImageMatch> = raw
        .into_iter()
        .enumerate()
        .map(|(index, r)| normalize(r, index, client.origin(), &catalog))
        .collect();

    info!(
        user = %user.email,
        results = results.len(),
        matched = results.iter().filter(|r| r.luminaire.is_some()).count(),
        "Image search"
    );

    Ok(Json(ImageSearchResponse {
        results,
        remaining: usage.remaining(),
    }))
}

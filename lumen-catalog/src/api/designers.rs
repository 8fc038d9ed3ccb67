//! Designer endpoints
//!
//! Luminaires belong to a designer when their `artist` text equals the
//! designer name exactly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use lumen_common::models::DesignerPatch;
use lumen_common::{Designer, Luminaire};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::auth::AdminUser;
use crate::db::{designers, luminaires};
use crate::error::ApiResult;
use crate::AppState;

/// Sample luminaires shown per designer in the listing
const SAMPLE_SIZE: i64 = 3;

/// Characters `encodeURIComponent` leaves alone
const SLUG_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL path segment for a designer name
pub fn designer_slug(name: &str) -> String {
    utf8_percent_encode(name, SLUG_SAFE).to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct DesignerListQuery {
    pub search: Option<String>,
    /// `name-asc` (default), `name-desc` or `count-desc`
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DesignerSummary {
    #[serde(flatten)]
    pub designer: Designer,
    pub count: i64,
    pub luminaires: Vec<Luminaire>,
    pub slug: String,
}

/// GET /api/designers
pub async fn list_designers(
    State(state): State<AppState>,
    Query(query): Query<DesignerListQuery>,
) -> ApiResult<Json<Vec<DesignerSummary>>> {
    let sort = query.sort.as_deref().unwrap_or("name-asc");
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let found = designers::list(&state.db, search, sort == "name-desc").await?;

    let mut summaries = Vec::with_capacity(found.len());
    for designer in found {
        let count = luminaires::count_by_artist(&state.db, &designer.name).await?;
        let samples = luminaires::by_artist(&state.db, &designer.name, Some(SAMPLE_SIZE)).await?;
        summaries.push(DesignerSummary {
            slug: designer_slug(&designer.name),
            designer,
            count,
            luminaires: samples,
        });
    }

    if sort == "count-desc" {
        // Stable: equal counts stay in name order
        summaries.sort_by(|a, b| b.count.cmp(&a.count));
    }

    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct DesignerDetail {
    pub name: String,
    pub image: String,
    pub specialty: String,
    pub collaboration: String,
    pub count: usize,
    pub luminaires: Vec<Luminaire>,
}

/// GET /api/designers/:name
///
/// Names without a designer profile still resolve, with empty profile
/// fields, so every artist in the catalog has a page.
pub async fn get_designer(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<DesignerDetail>> {
    let profile = designers::get(&state.db, &name).await?.unwrap_or_default();
    let works = luminaires::by_artist(&state.db, &name, None).await?;

    Ok(Json(DesignerDetail {
        image: profile.image_url.unwrap_or_default(),
        specialty: profile.description.unwrap_or_default(),
        collaboration: profile.collaboration.unwrap_or_default(),
        count: works.len(),
        luminaires: works,
        name,
    }))
}

/// POST /api/designers
pub async fn create_designer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(patch): Json<DesignerPatch>,
) -> ApiResult<(StatusCode, Json<Designer>)> {
    let designer = designers::insert(&state.db, patch).await?;
    info!(by = %admin.email, "Created designer '{}'", designer.name);
    Ok((StatusCode::CREATED, Json(designer)))
}

/// PUT /api/designers/:name
pub async fn upsert_designer(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(name): Path<String>,
    Json(patch): Json<DesignerPatch>,
) -> ApiResult<Json<Designer>> {
    let designer = designers::upsert(&state.db, &name, patch).await?;
    info!(by = %admin.email, "Upserted designer '{}'", designer.name);
    Ok(Json(designer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_matches_encode_uri_component() {
        assert_eq!(designer_slug("Émile Gallé"), "%C3%89mile%20Gall%C3%A9");
        assert_eq!(designer_slug("Daum (frères)"), "Daum%20(fr%C3%A8res)");
        assert_eq!(designer_slug("A/B & C"), "A%2FB%20%26%20C");
        assert_eq!(designer_slug("o'neil-x_y.z~*!"), "o'neil-x_y.z~*!");
    }
}

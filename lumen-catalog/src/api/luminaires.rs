//! Luminaire endpoints: listing, detail, similar items and admin edits

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use lumen_common::api::auth::listing_cap;
use lumen_common::db::get_setting_i64;
use lumen_common::models::LuminairePatch;
use lumen_common::repository::{similar_to, MemoryCatalog};
use lumen_common::similarity::{CoarseFilter, SimilarityMode, DEFAULT_LIMIT};
use lumen_common::Luminaire;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::api::auth::{AdminUser, MaybeUser};
use crate::db::luminaires::{self, ListFilter, SortOrder};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, DEFAULT_PAGE_SIZE};
use crate::periods::PERIODS;
use crate::AppState;

/// Catalog size above which scored similarity pre-filters in SQL
const DEFAULT_PREFILTER_THRESHOLD: i64 = 2000;

/// Query parameters for the catalog listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search: Option<String>,
    /// Artist name, `all` disables the filter
    pub artist: Option<String>,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    /// Timeline period name, or free text matched against descriptive fields
    pub period: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub favorites: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub luminaires: Vec<Luminaire>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Translate query parameters into a SQL filter
///
/// A period naming a timeline period narrows the year window; any other
/// period text is searched in specialty, collaboration and description.
fn build_filter(query: ListQuery, user: &MaybeUser) -> ApiResult<ListFilter> {
    let mut filter = ListFilter {
        search: non_blank(query.search),
        artist: non_blank(query.artist).filter(|a| !a.eq_ignore_ascii_case("all")),
        year_min: query.year_min,
        year_max: query.year_max,
        ..Default::default()
    };

    if let Some(period) = non_blank(query.period) {
        match PERIODS.iter().find(|p| p.name.to_lowercase() == period.to_lowercase()) {
            Some(known) => {
                filter.year_min = Some(filter.year_min.map_or(known.start, |min| min.max(known.start)));
                filter.year_max = Some(filter.year_max.map_or(known.end, |max| max.min(known.end)));
            }
            None => filter.period_text = Some(period),
        }
    }

    if query.favorites.unwrap_or(false) {
        let user = user
            .0
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("Favorites require a signed-in user".to_string()))?;
        filter.favorites_of = Some(user.guid.clone());
    }

    Ok(filter)
}

/// GET /api/luminaires
///
/// Free and anonymous callers only ever see the first `max(total / 10, 10)`
/// matches; pages past that cap come back empty.
pub async fn list_luminaires(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let sort = SortOrder::parse(query.sort.as_deref());
    let page = query.page.unwrap_or(1);
    let page_size = match query.limit {
        Some(limit) => limit,
        None => get_setting_i64(&state.db, "list_default_limit", DEFAULT_PAGE_SIZE).await?,
    };
    let filter = build_filter(query, &user)?;

    let total = luminaires::count(&state.db, &filter).await?;
    let visible = listing_cap(user.role(), total).map_or(total, |cap| total.min(cap));

    let pagination = calculate_pagination(visible, page, page_size);
    let take = (visible - pagination.offset).clamp(0, pagination.page_size);
    let items = if take > 0 {
        luminaires::list_page(&state.db, &filter, sort, take, pagination.offset).await?
    } else {
        Vec::new()
    };

    let has_more = pagination.has_more(items.len() as i64, visible);
    Ok(Json(ListResponse {
        luminaires: items,
        total: visible,
        page: pagination.page,
        total_pages: pagination.total_pages,
        has_more,
    }))
}

/// GET /api/luminaires/:id
pub async fn get_luminaire(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Luminaire>> {
    luminaires::get(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Luminaire {}", id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarQuery {
    /// `scored` (default) or `coarse`
    pub mode: Option<String>,
    pub limit: Option<usize>,
}

/// One similar luminaire; `score` is absent in coarse mode
#[derive(Debug, Serialize)]
pub struct SimilarEntry {
    pub luminaire: Luminaire,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// GET /api/luminaires/similar/:id
///
/// The candidate pool is loaded in storage order. Coarse mode lets SQL apply
/// the OR filter and the limit. Scored mode ranks the whole catalog, or only
/// the coarse matches once the catalog outgrows the pre-filter threshold;
/// both pools yield the same ranking since every scoring candidate also
/// passes the coarse filter.
pub async fn similar_luminaires(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<Vec<SimilarEntry>>> {
    let mode: SimilarityMode = match query.mode.as_deref() {
        Some(mode) => mode.parse()?,
        None => SimilarityMode::default(),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let target = luminaires::get(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Luminaire {}", id)))?;
    let filter = CoarseFilter::for_target(&target);

    let mut pool = match mode {
        SimilarityMode::Coarse => {
            let sql_limit = i64::try_from(limit).unwrap_or(i64::MAX);
            luminaires::coarse_candidates(&state.db, &filter, Some(sql_limit)).await?
        }
        SimilarityMode::Scored => {
            let threshold = get_setting_i64(
                &state.db,
                "similarity_prefilter_threshold",
                DEFAULT_PREFILTER_THRESHOLD,
            )
            .await?;

            if luminaires::count_all(&state.db).await? > threshold {
                luminaires::coarse_candidates(&state.db, &filter, None).await?
            } else {
                luminaires::list_all(&state.db).await?
            }
        }
    };

    // Keep the target resolvable; both modes skip its id when ranking
    if !pool.iter().any(|l| l.id == target.id) {
        pool.push(target);
    }
    let catalog = MemoryCatalog::new(pool);

    let similar = similar_to(&catalog, &id, mode, limit)
        .ok_or_else(|| ApiError::NotFound(format!("Luminaire {}", id)))?;

    Ok(Json(
        similar
            .into_iter()
            .map(|s| SimilarEntry {
                luminaire: s.item.clone(),
                score: s.score,
            })
            .collect(),
    ))
}

/// POST /api/luminaires
pub async fn create_luminaire(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(patch): Json<LuminairePatch>,
) -> ApiResult<(StatusCode, Json<Luminaire>)> {
    let luminaire = luminaires::insert(&state.db, patch).await?;
    info!(id = %luminaire.id, by = %admin.email, "Created luminaire '{}'", luminaire.name);
    Ok((StatusCode::CREATED, Json(luminaire)))
}

/// PUT /api/luminaires/:id
pub async fn update_luminaire(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<LuminairePatch>,
) -> ApiResult<Json<Luminaire>> {
    let luminaire = luminaires::update(&state.db, &id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Luminaire {}", id)))?;
    info!(id = %id, by = %admin.email, "Updated luminaire");
    Ok(Json(luminaire))
}

/// DELETE /api/luminaires/:id
pub async fn delete_luminaire(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !luminaires::delete(&state.db, &id).await? {
        return Err(ApiError::NotFound(format!("Luminaire {}", id)));
    }
    info!(id = %id, by = %admin.email, "Deleted luminaire");
    Ok(Json(json!({ "message": "Luminaire deleted" })))
}

//! CSV export endpoint

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::api::auth::AdminUser;
use crate::db::luminaires;
use crate::error::ApiResult;
use crate::export::render_csv;
use crate::AppState;

/// GET /api/export/csv
pub async fn export_csv(State(state): State<AppState>, AdminUser(admin): AdminUser) -> ApiResult<Response> {
    let all = luminaires::list_all(&state.db).await?;
    info!(by = %admin.email, "Exporting {} luminaires", all.len());

    let filename = format!("luminaires-{}.csv", lumen_common::time::today());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        render_csv(&all),
    )
        .into_response())
}

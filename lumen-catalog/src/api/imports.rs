//! Spreadsheet imports

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::auth::AdminUser;
use crate::db::{designers, luminaires};
use crate::error::ApiResult;
use crate::import::{designer_from_row, luminaire_from_row, CsvRow, ImportKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CsvImportRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Vec<CsvRow>,
}

#[derive(Debug, Serialize)]
pub struct CsvImportResponse {
    pub message: String,
    /// Rows written
    pub count: usize,
    /// Rows without a name
    pub skipped: usize,
}

/// POST /api/upload/csv
///
/// Luminaire rows are inserted as new items; designer rows are upserted by
/// name. Rows without a name are skipped.
pub async fn upload_csv(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CsvImportRequest>,
) -> ApiResult<Json<CsvImportResponse>> {
    let kind: ImportKind = request.kind.parse()?;
    let mut count = 0;
    let mut skipped = 0;

    match kind {
        ImportKind::Luminaires => {
            for row in &request.data {
                match luminaire_from_row(row) {
                    Some(patch) => {
                        luminaires::insert(&state.db, patch).await?;
                        count += 1;
                    }
                    None => skipped += 1,
                }
            }
        }
        ImportKind::Designers => {
            for row in &request.data {
                match designer_from_row(row) {
                    Some(patch) => {
                        designers::import(&state.db, patch).await?;
                        count += 1;
                    }
                    None => skipped += 1,
                }
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} {:?} rows without a name", skipped, kind);
    }
    info!(by = %admin.email, "Imported {} {:?} rows", count, kind);

    let noun = match kind {
        ImportKind::Luminaires => "luminaires",
        ImportKind::Designers => "designers",
    };
    Ok(Json(CsvImportResponse {
        message: format!("{} {} imported", count, noun),
        count,
        skipped,
    }))
}

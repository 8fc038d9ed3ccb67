//! Stored timeline period descriptions

use lumen_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// All stored descriptions keyed by period name
pub async fn descriptions(db: &SqlitePool) -> Result<HashMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT period_name, description FROM timeline_descriptions")
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().collect())
}

pub async fn set_description(db: &SqlitePool, period_name: &str, description: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO timeline_descriptions (period_name, description) VALUES (?, ?)
        ON CONFLICT(period_name) DO UPDATE SET
            description = excluded.description,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(period_name)
    .bind(description)
    .execute(db)
    .await?;
    Ok(())
}

//! Designer queries

use lumen_common::models::DesignerPatch;
use lumen_common::{Designer, Error, Result};
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str =
    "SELECT name, image_file, image_url, image_path, description, collaboration FROM designers";

fn designer_from_row(row: &sqlx::sqlite::SqliteRow) -> Designer {
    Designer {
        name: row.get("name"),
        image_file: row.get("image_file"),
        image_url: row.get("image_url"),
        image_path: row.get("image_path"),
        description: row.get("description"),
        collaboration: row.get("collaboration"),
    }
}

/// Designers whose name contains `search` (case-insensitive), by name
pub async fn list(db: &SqlitePool, search: Option<&str>, descending: bool) -> Result<Vec<Designer>> {
    let order = if descending { "DESC" } else { "ASC" };
    let rows = match search {
        Some(search) => {
            sqlx::query(&format!(
                "{} WHERE instr(lower(name), ?) > 0 ORDER BY name COLLATE NOCASE {}",
                SELECT_COLUMNS, order
            ))
            .bind(search.to_lowercase())
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query(&format!("{} ORDER BY name COLLATE NOCASE {}", SELECT_COLUMNS, order))
                .fetch_all(db)
                .await?
        }
    };

    Ok(rows.iter().map(designer_from_row).collect())
}

pub async fn get(db: &SqlitePool, name: &str) -> Result<Option<Designer>> {
    let row = sqlx::query(&format!("{} WHERE name = ?", SELECT_COLUMNS))
        .bind(name)
        .fetch_optional(db)
        .await?;
    Ok(row.as_ref().map(designer_from_row))
}

fn required_name(patch: &DesignerPatch) -> Result<String> {
    patch
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput("Designer name is required".to_string()))
}

/// Create a designer; fails if the name is taken
pub async fn insert(db: &SqlitePool, patch: DesignerPatch) -> Result<Designer> {
    let name = required_name(&patch)?;

    if get(db, &name).await?.is_some() {
        return Err(Error::InvalidInput(format!("Designer already exists: {}", name)));
    }

    sqlx::query(
        "INSERT INTO designers (name, image_file, image_url, description, collaboration) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(&patch.image_file)
    .bind(&patch.image_url)
    .bind(&patch.description)
    .bind(&patch.collaboration)
    .execute(db)
    .await?;

    get(db, &name)
        .await?
        .ok_or_else(|| Error::Internal(format!("Designer {} vanished after insert", name)))
}

/// Insert or update the designer `name`
///
/// Absent patch fields keep their stored value.
pub async fn upsert(db: &SqlitePool, name: &str, patch: DesignerPatch) -> Result<Designer> {
    sqlx::query(
        r#"
        INSERT INTO designers (name, image_file, image_url, description, collaboration)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            image_file = COALESCE(excluded.image_file, image_file),
            image_url = COALESCE(excluded.image_url, image_url),
            description = COALESCE(excluded.description, description),
            collaboration = COALESCE(excluded.collaboration, collaboration),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(name)
    .bind(&patch.image_file)
    .bind(&patch.image_url)
    .bind(&patch.description)
    .bind(&patch.collaboration)
    .execute(db)
    .await?;

    get(db, name)
        .await?
        .ok_or_else(|| Error::Internal(format!("Designer {} vanished after upsert", name)))
}

/// Upsert a designer imported from a spreadsheet row
pub async fn import(db: &SqlitePool, patch: DesignerPatch) -> Result<Designer> {
    let name = required_name(&patch)?;
    upsert(db, &name, patch).await
}

pub async fn list_all(db: &SqlitePool) -> Result<Vec<Designer>> {
    let rows = sqlx::query(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
        .fetch_all(db)
        .await?;
    Ok(rows.iter().map(designer_from_row).collect())
}

/// Attach an uploaded portrait
pub async fn set_image(db: &SqlitePool, name: &str, image_url: &str, image_path: &str) -> Result<()> {
    sqlx::query(
        "UPDATE designers SET image_url = ?, image_path = ?, updated_at = CURRENT_TIMESTAMP WHERE name = ?",
    )
    .bind(image_url)
    .bind(image_path)
    .bind(name)
    .execute(db)
    .await?;
    Ok(())
}

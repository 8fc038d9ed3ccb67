//! Luminaire queries
//!
//! Writes keep the lowercase `*_key` columns and `year_num` in step with
//! the text columns, so SQL filters see the same values as the in-memory
//! similarity rules.

use lumen_common::models::LuminairePatch;
use lumen_common::similarity::CoarseFilter;
use lumen_common::year::parse_leading_int;
use lumen_common::{uuid_utils, Error, Luminaire, Result};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const SELECT_COLUMNS: &str = "SELECT id, name, artist, year, specialty, collaboration, signed, \
     image_path, image_url, filename, dimensions, estimation, materials, description, url, \
     CAST(created_at AS TEXT) AS created_at, CAST(updated_at AS TEXT) AS updated_at \
     FROM luminaires";

fn luminaire_from_row(row: &sqlx::sqlite::SqliteRow) -> Luminaire {
    Luminaire {
        id: row.get("id"),
        name: row.get("name"),
        artist: row.get("artist"),
        year: row.get("year"),
        specialty: row.get("specialty"),
        collaboration: row.get("collaboration"),
        signed: row.get("signed"),
        image_path: row.get("image_path"),
        image_url: row.get("image_url"),
        filename: row.get("filename"),
        dimensions: row.get("dimensions"),
        estimation: row.get("estimation"),
        materials: row.get("materials"),
        description: row.get("description"),
        url: row.get("url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Lowercased comparison key, empty when absent
fn key(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().to_lowercase()
}

fn year_num(luminaire: &Luminaire) -> Option<i64> {
    luminaire.year.as_deref().and_then(parse_leading_int)
}

// ========================================
// Listing
// ========================================

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    YearAsc,
    YearDesc,
}

impl SortOrder {
    /// Parse a `sort` query value, unknown values fall back to name order
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or_default() {
            "name-desc" => SortOrder::NameDesc,
            "year-asc" => SortOrder::YearAsc,
            "year-desc" => SortOrder::YearDesc,
            _ => SortOrder::NameAsc,
        }
    }

    fn order_by(self) -> &'static str {
        // Unparsed years sort last in both directions
        match self {
            SortOrder::NameAsc => " ORDER BY name COLLATE NOCASE ASC, rowid ASC",
            SortOrder::NameDesc => " ORDER BY name COLLATE NOCASE DESC, rowid ASC",
            SortOrder::YearAsc => " ORDER BY year_num IS NULL, year_num ASC, name COLLATE NOCASE ASC, rowid ASC",
            SortOrder::YearDesc => " ORDER BY year_num IS NULL, year_num DESC, name COLLATE NOCASE ASC, rowid ASC",
        }
    }
}

/// Catalog listing filters; every present field narrows the result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Substring of name, artist, specialty, collaboration or description
    pub search: Option<String>,
    /// Exact artist, case-insensitive
    pub artist: Option<String>,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    /// Free-text period: substring of specialty, collaboration or description
    pub period_text: Option<String>,
    /// Only favorites of this user
    pub favorites_of: Option<String>,
}

impl ListFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            qb.push(" AND (");
            for (i, column) in ["lower(name)", "artist_key", "specialty_key", "collaboration_key", "lower(description)"]
                .iter()
                .enumerate()
            {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("instr(COALESCE({}, ''), ", column));
                qb.push_bind(needle.clone());
                qb.push(") > 0");
            }
            qb.push(")");
        }

        if let Some(artist) = &self.artist {
            qb.push(" AND artist_key = ");
            qb.push_bind(artist.to_lowercase());
        }

        if let Some(min) = self.year_min {
            qb.push(" AND year_num >= ");
            qb.push_bind(min);
        }

        if let Some(max) = self.year_max {
            qb.push(" AND year_num <= ");
            qb.push_bind(max);
        }

        if let Some(text) = &self.period_text {
            let needle = text.to_lowercase();
            qb.push(" AND (instr(specialty_key, ");
            qb.push_bind(needle.clone());
            qb.push(") > 0 OR instr(collaboration_key, ");
            qb.push_bind(needle.clone());
            qb.push(") > 0 OR instr(lower(COALESCE(description, '')), ");
            qb.push_bind(needle);
            qb.push(") > 0)");
        }

        if let Some(user_guid) = &self.favorites_of {
            qb.push(" AND id IN (SELECT luminaire_id FROM favorites WHERE user_guid = ");
            qb.push_bind(user_guid.clone());
            qb.push(")");
        }
    }
}

/// Number of luminaires matching `filter`
pub async fn count(db: &SqlitePool, filter: &ListFilter) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM luminaires");
    filter.push_where(&mut qb);

    let total: i64 = qb.build_query_scalar().fetch_one(db).await?;
    Ok(total)
}

/// One page of luminaires matching `filter`
pub async fn list_page(
    db: &SqlitePool,
    filter: &ListFilter,
    sort: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<Luminaire>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    filter.push_where(&mut qb);
    qb.push(sort.order_by());
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let rows = qb.build().fetch_all(db).await?;
    Ok(rows.iter().map(luminaire_from_row).collect())
}

/// Every luminaire in storage order
pub async fn list_all(db: &SqlitePool) -> Result<Vec<Luminaire>> {
    let rows = sqlx::query(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
        .fetch_all(db)
        .await?;
    Ok(rows.iter().map(luminaire_from_row).collect())
}

pub async fn count_all(db: &SqlitePool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM luminaires")
        .fetch_one(db)
        .await?;
    Ok(total)
}

/// Candidates passing the coarse similarity filter, in storage order
///
/// With `limit` unset every match is returned, which is what the scored
/// ranking uses as its pre-filter.
pub async fn coarse_candidates(
    db: &SqlitePool,
    filter: &CoarseFilter,
    limit: Option<i64>,
) -> Result<Vec<Luminaire>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    qb.push(" WHERE id != ");
    qb.push_bind(filter.exclude_id.clone());

    if !filter.is_unconstrained() {
        qb.push(" AND (0");
        if let Some(artist) = &filter.artist {
            qb.push(" OR artist_key = ");
            qb.push_bind(artist.clone());
        }
        if let Some(specialty) = &filter.specialty {
            qb.push(" OR specialty_key = ");
            qb.push_bind(specialty.clone());
        }
        if let Some(years) = &filter.years {
            qb.push(" OR year_num BETWEEN ");
            qb.push_bind(years.min);
            qb.push(" AND ");
            qb.push_bind(years.max);
        }
        if let Some(collaboration) = &filter.collaboration {
            qb.push(" OR instr(collaboration_key, ");
            qb.push_bind(collaboration.clone());
            qb.push(") > 0");
        }
        qb.push(")");
    }

    qb.push(" ORDER BY rowid");
    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }

    let rows = qb.build().fetch_all(db).await?;
    Ok(rows.iter().map(luminaire_from_row).collect())
}

/// Luminaires whose artist text is exactly `artist`, in storage order
pub async fn by_artist(db: &SqlitePool, artist: &str, limit: Option<i64>) -> Result<Vec<Luminaire>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    qb.push(" WHERE artist = ");
    qb.push_bind(artist.to_string());
    qb.push(" ORDER BY rowid");
    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }

    let rows = qb.build().fetch_all(db).await?;
    Ok(rows.iter().map(luminaire_from_row).collect())
}

pub async fn count_by_artist(db: &SqlitePool, artist: &str) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM luminaires WHERE artist = ?")
        .bind(artist)
        .fetch_one(db)
        .await?;
    Ok(total)
}

// ========================================
// Single items
// ========================================

pub async fn get(db: &SqlitePool, id: &str) -> Result<Option<Luminaire>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.as_ref().map(luminaire_from_row))
}

/// Insert a new luminaire built from `patch`
///
/// A name is required.
pub async fn insert(db: &SqlitePool, patch: LuminairePatch) -> Result<Luminaire> {
    let name = patch
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("Luminaire name is required".to_string()))?
        .to_string();

    let mut luminaire = Luminaire::new(uuid_utils::generate_id(), name);
    luminaire.apply(LuminairePatch { name: None, ..patch });

    sqlx::query(
        r#"
        INSERT INTO luminaires (
            id, name, artist, year, specialty, collaboration, signed, image_path, image_url,
            filename, dimensions, estimation, materials, description, url,
            artist_key, specialty_key, collaboration_key, year_num
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&luminaire.id)
    .bind(&luminaire.name)
    .bind(&luminaire.artist)
    .bind(&luminaire.year)
    .bind(&luminaire.specialty)
    .bind(&luminaire.collaboration)
    .bind(&luminaire.signed)
    .bind(&luminaire.image_path)
    .bind(&luminaire.image_url)
    .bind(&luminaire.filename)
    .bind(&luminaire.dimensions)
    .bind(&luminaire.estimation)
    .bind(&luminaire.materials)
    .bind(&luminaire.description)
    .bind(&luminaire.url)
    .bind(key(&luminaire.artist))
    .bind(key(&luminaire.specialty))
    .bind(key(&luminaire.collaboration))
    .bind(year_num(&luminaire))
    .execute(db)
    .await?;

    // Pick up the stored timestamps
    get(db, &luminaire.id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Luminaire {} vanished after insert", luminaire.id)))
}

/// Write every column of an existing luminaire
async fn save(db: &SqlitePool, luminaire: &Luminaire) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE luminaires SET
            name = ?, artist = ?, year = ?, specialty = ?, collaboration = ?, signed = ?,
            image_path = ?, image_url = ?, filename = ?, dimensions = ?, estimation = ?,
            materials = ?, description = ?, url = ?,
            artist_key = ?, specialty_key = ?, collaboration_key = ?, year_num = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&luminaire.name)
    .bind(&luminaire.artist)
    .bind(&luminaire.year)
    .bind(&luminaire.specialty)
    .bind(&luminaire.collaboration)
    .bind(&luminaire.signed)
    .bind(&luminaire.image_path)
    .bind(&luminaire.image_url)
    .bind(&luminaire.filename)
    .bind(&luminaire.dimensions)
    .bind(&luminaire.estimation)
    .bind(&luminaire.materials)
    .bind(&luminaire.description)
    .bind(&luminaire.url)
    .bind(key(&luminaire.artist))
    .bind(key(&luminaire.specialty))
    .bind(key(&luminaire.collaboration))
    .bind(year_num(luminaire))
    .bind(&luminaire.id)
    .execute(db)
    .await?;

    Ok(())
}

/// Apply `patch` to the luminaire `id`; `None` when it does not exist
pub async fn update(db: &SqlitePool, id: &str, patch: LuminairePatch) -> Result<Option<Luminaire>> {
    let Some(mut luminaire) = get(db, id).await? else {
        return Ok(None);
    };

    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(Error::InvalidInput("Luminaire name cannot be empty".to_string()));
    }

    luminaire.apply(patch);
    save(db, &luminaire).await?;
    get(db, id).await
}

/// Attach an uploaded image
pub async fn set_image(db: &SqlitePool, id: &str, image_url: &str, image_path: &str) -> Result<()> {
    sqlx::query(
        "UPDATE luminaires SET image_url = ?, image_path = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(image_url)
    .bind(image_path)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Delete a luminaire, returning whether it existed
pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM luminaires WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

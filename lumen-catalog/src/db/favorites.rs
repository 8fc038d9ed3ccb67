//! Per-user favorite luminaires

use lumen_common::Result;
use sqlx::SqlitePool;

/// Flip the favorite flag, returning the new state
pub async fn toggle(db: &SqlitePool, user_guid: &str, luminaire_id: &str) -> Result<bool> {
    let removed = sqlx::query("DELETE FROM favorites WHERE user_guid = ? AND luminaire_id = ?")
        .bind(user_guid)
        .bind(luminaire_id)
        .execute(db)
        .await?;

    if removed.rows_affected() > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT INTO favorites (user_guid, luminaire_id) VALUES (?, ?)")
        .bind(user_guid)
        .bind(luminaire_id)
        .execute(db)
        .await?;
    Ok(true)
}

/// Favorite luminaire ids, oldest first
pub async fn list_ids(db: &SqlitePool, user_guid: &str) -> Result<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT luminaire_id FROM favorites WHERE user_guid = ? ORDER BY created_at, rowid",
    )
    .bind(user_guid)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::api::auth::create_user;
    use lumen_common::db::init_database;
    use lumen_common::Role;

    #[tokio::test]
    async fn test_toggle_and_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let db = init_database(&dir.path().join("lumen.db")).await.unwrap();
        let (user, _) = create_user(&db, "fan@example.org", Role::Free).await.unwrap();
        sqlx::query("INSERT INTO luminaires (id, name) VALUES ('l1', 'Lampe')")
            .execute(&db)
            .await
            .unwrap();

        assert!(toggle(&db, &user.guid, "l1").await.unwrap());
        assert_eq!(list_ids(&db, &user.guid).await.unwrap(), vec!["l1"]);
        assert!(!toggle(&db, &user.guid, "l1").await.unwrap());
        assert!(list_ids(&db, &user.guid).await.unwrap().is_empty());

        toggle(&db, &user.guid, "l1").await.unwrap();
        sqlx::query("DELETE FROM luminaires WHERE id = 'l1'")
            .execute(&db)
            .await
            .unwrap();
        assert!(list_ids(&db, &user.guid).await.unwrap().is_empty());
    }
}

//! Upload metadata; file bytes live on disk under the uploads folder

use sqlx::SqlitePool;

use inn_common::db::Upload;
use inn_common::{Error, Result};

pub async fn insert_upload(pool: &SqlitePool, upload: &Upload) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO uploads (
            id, team_id, kind, file_name, content_type, size_bytes, stored_path, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&upload.id)
    .bind(&upload.team_id)
    .bind(&upload.kind)
    .bind(&upload.file_name)
    .bind(&upload.content_type)
    .bind(upload.size_bytes)
    .bind(&upload.stored_path)
    .bind(&upload.created_at)
    .execute(pool)
    .await
    .map_err(|e| Error::from_insert(e, "Upload"))?;
    Ok(())
}

/// Uploads of one team, newest first
pub async fn list_uploads(pool: &SqlitePool, team_id: &str) -> Result<Vec<Upload>> {
    let uploads = sqlx::query_as::<_, Upload>(
        "SELECT * FROM uploads WHERE team_id = ? ORDER BY created_at DESC, id",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(uploads)
}

//! Telecast (live broadcast banner) state and viewer acknowledgements
//!
//! Viewers are keyed by the telecast's `started_at`, so restarting the
//! broadcast starts a fresh viewer list.

use sqlx::SqlitePool;

use inn_common::db::{Telecast, TelecastViewer};
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

pub async fn get_telecast(pool: &SqlitePool) -> Result<Telecast> {
    sqlx::query_as::<_, Telecast>(
        "SELECT active, video_url, message, started_at, updated_at FROM telecast WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::Internal("Telecast row missing".into()))
}

/// Turn the telecast on or off
///
/// Activating requires a video URL. Activating an already active telecast
/// keeps its `started_at` (and therefore its viewers).
pub async fn set_telecast(
    pool: &SqlitePool,
    active: bool,
    video_url: Option<&str>,
    message: Option<&str>,
) -> Result<Telecast> {
    let video_url = video_url.map(str::trim).filter(|u| !u.is_empty());
    let message = message.map(str::trim).filter(|m| !m.is_empty());

    if active && video_url.is_none() {
        return Err(Error::InvalidInput(
            "video_url is required to start a telecast".into(),
        ));
    }

    let current = get_telecast(pool).await?;
    let now = now_rfc3339();
    let started_at = match (active, current.active) {
        (true, true) => current.started_at,
        (true, false) => Some(now.clone()),
        (false, _) => None,
    };

    sqlx::query(
        "UPDATE telecast SET active = ?, video_url = ?, message = ?, started_at = ?, updated_at = ? WHERE id = 1",
    )
    .bind(active)
    .bind(video_url)
    .bind(message)
    .bind(&started_at)
    .bind(&now)
    .execute(pool)
    .await?;

    get_telecast(pool).await
}

/// Record that a team has seen the active telecast
///
/// `Conflict` when no telecast is active. Acknowledging twice is a no-op.
pub async fn acknowledge(pool: &SqlitePool, team_id: &str) -> Result<Telecast> {
    let telecast = get_telecast(pool).await?;
    let started_at = match (telecast.active, telecast.started_at.as_deref()) {
        (true, Some(started_at)) => started_at.to_string(),
        _ => return Err(Error::Conflict("No telecast is active".into())),
    };

    sqlx::query(
        "INSERT OR IGNORE INTO telecast_viewers (team_id, telecast_started_at, acknowledged_at) VALUES (?, ?, ?)",
    )
    .bind(team_id)
    .bind(&started_at)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    Ok(telecast)
}

/// Teams that acknowledged the current telecast
pub async fn list_viewers(pool: &SqlitePool) -> Result<Vec<TelecastViewer>> {
    let telecast = get_telecast(pool).await?;
    let Some(started_at) = telecast.started_at.filter(|_| telecast.active) else {
        return Ok(Vec::new());
    };

    let viewers = sqlx::query_as::<_, TelecastViewer>(
        r#"
        SELECT v.team_id, t.team_name, v.acknowledged_at
        FROM telecast_viewers v
        JOIN teams t ON t.team_id = v.team_id
        WHERE v.telecast_started_at = ?
        ORDER BY v.acknowledged_at, v.team_id
        "#,
    )
    .bind(started_at)
    .fetch_all(pool)
    .await?;
    Ok(viewers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::teams::{create_team, NewTeam};
    use inn_common::db::init_memory_database;

    async fn setup() -> (SqlitePool, String) {
        let pool = init_memory_database().await.unwrap();
        let team = create_team(
            &pool,
            &NewTeam {
                team_id: None,
                team_name: "Alpha".into(),
                member1: "Ada".into(),
                member2: None,
                password: "secret1".into(),
            },
        )
        .await
        .unwrap();
        (pool, team.team_id)
    }

    #[tokio::test]
    async fn test_starts_inactive() {
        let (pool, _) = setup().await;
        let telecast = get_telecast(&pool).await.unwrap();
        assert!(!telecast.active);
        assert!(list_viewers(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activation_requires_url() {
        let (pool, _) = setup().await;
        let err = set_telecast(&pool, true, Some("  "), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ack_flow() {
        let (pool, team_id) = setup().await;

        assert!(matches!(
            acknowledge(&pool, &team_id).await.unwrap_err(),
            Error::Conflict(_)
        ));

        let on = set_telecast(&pool, true, Some("https://video.example/live"), Some("Hi"))
            .await
            .unwrap();
        assert!(on.active);
        assert!(on.started_at.is_some());

        acknowledge(&pool, &team_id).await.unwrap();
        acknowledge(&pool, &team_id).await.unwrap();
        let viewers = list_viewers(&pool).await.unwrap();
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].team_name, "Alpha");

        // Updating the message keeps the viewer list
        let same = set_telecast(&pool, true, Some("https://video.example/live"), Some("Bye"))
            .await
            .unwrap();
        assert_eq!(same.started_at, on.started_at);
        assert_eq!(list_viewers(&pool).await.unwrap().len(), 1);

        let off = set_telecast(&pool, false, None, None).await.unwrap();
        assert!(!off.active);
        assert!(off.started_at.is_none());
        assert!(list_viewers(&pool).await.unwrap().is_empty());
    }
}

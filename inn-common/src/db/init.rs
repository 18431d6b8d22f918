//! Database initialization
//!
//! Creates the contest schema on first run and seeds the fixed rows
//! (three rounds, one telecast row). Every statement is idempotent so the
//! server can be restarted against an existing database.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and make sure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection that is never recycled, since every
/// SQLite `:memory:` connection is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and seed rows
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_teams_table(pool).await?;
    create_rounds_table(pool).await?;
    create_submission_tables(pool).await?;
    create_evaluation_table(pool).await?;
    create_ai_jobs_table(pool).await?;
    create_telecast_tables(pool).await?;
    create_uploads_table(pool).await?;

    seed_rounds(pool).await?;
    seed_telecast(pool).await?;

    info!("Database schema ready");
    Ok(())
}

pub async fn create_teams_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            team_id TEXT PRIMARY KEY,
            team_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            member1 TEXT NOT NULL,
            member2 TEXT,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            round1_score REAL,
            round2_score REAL,
            round3_score REAL,
            round1_submitted INTEGER NOT NULL DEFAULT 0,
            round2_submitted INTEGER NOT NULL DEFAULT 0,
            round3_submitted INTEGER NOT NULL DEFAULT 0,
            round1_rank INTEGER,
            round2_rank INTEGER,
            round3_rank INTEGER,
            overall_rank INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_rounds_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rounds (
            round_number INTEGER PRIMARY KEY CHECK (round_number BETWEEN 1 AND 3),
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'active', 'completed')),
            started_at TEXT,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submission_tables(pool: &SqlitePool) -> Result<()> {
    for table in ["submissions_round1", "submissions_round2"] {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
                question_id TEXT NOT NULL,
                answer TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                UNIQUE (team_id, question_id)
            )
            "#,
            table
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_evaluation_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
            round_number INTEGER NOT NULL,
            question_id TEXT NOT NULL,
            answer TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'completed', 'failed', 'overridden')),
            ai_score REAL,
            ai_analysis TEXT,
            admin_score REAL,
            admin_notes TEXT,
            final_score REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (team_id, round_number, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ai_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_jobs (
            id TEXT PRIMARY KEY,
            round_number INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('running', 'completed', 'failed')),
            total INTEGER NOT NULL DEFAULT 0,
            succeeded INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_telecast_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS telecast (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            active INTEGER NOT NULL DEFAULT 0,
            video_url TEXT,
            message TEXT,
            started_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS telecast_viewers (
            team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
            telecast_started_at TEXT NOT NULL,
            acknowledged_at TEXT NOT NULL,
            PRIMARY KEY (team_id, telecast_started_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_uploads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS uploads (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            stored_path TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_rounds(pool: &SqlitePool) -> Result<()> {
    for round in crate::db::Round::ALL {
        sqlx::query("INSERT OR IGNORE INTO rounds (round_number, name, status) VALUES (?, ?, 'pending')")
            .bind(round.number())
            .bind(round.name())
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn seed_telecast(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO telecast (id, active, updated_at) VALUES (1, 0, ?)")
        .bind(crate::time::now_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

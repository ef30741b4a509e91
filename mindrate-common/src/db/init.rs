//! Database initialization
//!
//! Creates the survey schema on first run. Every statement is
//! `CREATE ... IF NOT EXISTS`, so opening an existing database is a no-op.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection: every new SQLite memory connection would
/// otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all survey tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Schema tables
    create_studies_table(pool).await?;
    create_proband_info_questionnaires_table(pool).await?;
    create_questionnaires_table(pool).await?;
    create_trigger_events_table(pool).await?;
    create_questions_table(pool).await?;
    create_choice_options_table(pool).await?;

    // Collected data tables
    create_probands_table(pool).await?;
    create_proband_info_cells_table(pool).await?;
    create_questionnaire_answers_table(pool).await?;
    create_sensor_value_cells_table(pool).await?;
    create_answer_tables(pool).await?;

    Ok(())
}

async fn create_studies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            name TEXT NOT NULL,
            start_date_time TEXT NOT NULL,
            end_date_time TEXT NOT NULL,
            answer_count INTEGER NOT NULL DEFAULT 0,
            UNIQUE (owner, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_proband_info_questionnaires_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proband_info_questionnaires (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            study_id INTEGER NOT NULL UNIQUE REFERENCES studies(id) ON DELETE CASCADE,
            birthday INTEGER NOT NULL DEFAULT 0,
            gender INTEGER NOT NULL DEFAULT 0,
            occupation INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questionnaires_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questionnaires (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            study_id INTEGER NOT NULL REFERENCES studies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            due_after_seconds INTEGER,
            max_trigger_times_per_day INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_trigger_events_table(pool: &SqlitePool) -> Result<()> {
    // Sensor columns hold SensorLevel codes (VL, L, M, H, VH)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trigger_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            questionnaire_id INTEGER NOT NULL UNIQUE REFERENCES questionnaires(id) ON DELETE CASCADE,
            min_time_space_seconds INTEGER NOT NULL DEFAULT 0,
            datetime TEXT,
            time TEXT,
            light TEXT,
            relative_humidity TEXT,
            temperature TEXT,
            air_pressure TEXT,
            proximity TEXT,
            activity TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            questionnaire_id INTEGER REFERENCES questionnaires(id) ON DELETE CASCADE,
            proband_info_questionnaire_id INTEGER REFERENCES proband_info_questionnaires(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            position INTEGER NOT NULL,
            question_text TEXT NOT NULL,
            show_by_default INTEGER NOT NULL DEFAULT 1,
            min_value REAL,
            max_value REAL,
            CHECK ((questionnaire_id IS NULL) <> (proband_info_questionnaire_id IS NULL)),
            UNIQUE (questionnaire_id, position),
            UNIQUE (proband_info_questionnaire_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_choice_options_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS choice_options (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            choice_text TEXT NOT NULL,
            next_question_position INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_probands_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS probands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            study_id INTEGER NOT NULL REFERENCES studies(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_proband_info_cells_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proband_info_cells (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proband_id INTEGER NOT NULL REFERENCES probands(id) ON DELETE CASCADE,
            info_key TEXT NOT NULL,
            info_value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questionnaire_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questionnaire_answers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proband_id INTEGER NOT NULL REFERENCES probands(id) ON DELETE CASCADE,
            questionnaire_id INTEGER NOT NULL REFERENCES questionnaires(id) ON DELETE CASCADE,
            submitted_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sensor_value_cells_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_value_cells (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            questionnaire_answer_id INTEGER NOT NULL REFERENCES questionnaire_answers(id) ON DELETE CASCADE,
            sensor TEXT NOT NULL,
            value REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One table per answer variant, all sharing the same link columns
async fn create_answer_tables(pool: &SqlitePool) -> Result<()> {
    for (table, value_type) in [
        ("text_answers", "TEXT"),
        ("single_choice_answers", "TEXT"),
        ("multi_choice_answers", "TEXT"),
        ("drag_scale_answers", "REAL"),
    ] {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                questionnaire_answer_id INTEGER NOT NULL REFERENCES questionnaire_answers(id) ON DELETE CASCADE,
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                value {value_type} NOT NULL
            )
            "#
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

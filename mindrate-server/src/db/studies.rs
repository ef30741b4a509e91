//! Study and proband-info questionnaire persistence

use mindrate_common::models::{NewStudy, ProbandInfoQuestionnaire, Study};
use mindrate_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

fn study_from_row(row: &SqliteRow) -> Result<Study> {
    Ok(Study {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        name: row.try_get("name")?,
        start_date_time: row.try_get("start_date_time")?,
        end_date_time: row.try_get("end_date_time")?,
        answer_count: row.try_get("answer_count")?,
    })
}

/// Create a study; names are unique per owner
pub async fn create_study(pool: &SqlitePool, study: &NewStudy) -> Result<Study> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM studies WHERE owner = ? AND name = ?")
            .bind(&study.owner)
            .bind(&study.name)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(Error::Conflict(format!(
            "Study '{}' already exists for {}",
            study.name, study.owner
        )));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO studies (owner, name, start_date_time, end_date_time, answer_count)
        VALUES (?, ?, ?, ?, 0)
        "#,
    )
    .bind(&study.owner)
    .bind(&study.name)
    .bind(study.start_date_time)
    .bind(study.end_date_time)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Study {
        id,
        owner: study.owner.clone(),
        name: study.name.clone(),
        start_date_time: study.start_date_time,
        end_date_time: study.end_date_time,
        answer_count: 0,
    })
}

/// Load study by id
pub async fn load_study<'e, E>(executor: E, study_id: i64) -> Result<Option<Study>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, owner, name, start_date_time, end_date_time, answer_count
        FROM studies
        WHERE id = ?
        "#,
    )
    .bind(study_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(study_from_row).transpose()
}

/// All studies, oldest first
pub async fn list_studies(pool: &SqlitePool) -> Result<Vec<Study>> {
    let rows = sqlx::query(
        "SELECT id, owner, name, start_date_time, end_date_time, answer_count FROM studies ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(study_from_row).collect()
}

/// Bump the submission counter of a study
pub async fn increment_answer_count<'e, E>(executor: E, study_id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE studies SET answer_count = answer_count + 1 WHERE id = ?")
        .bind(study_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("study", study_id));
    }

    Ok(())
}

/// Create or replace the flags of the study's proband-info questionnaire
pub async fn set_proband_info_questionnaire(
    pool: &SqlitePool,
    study_id: i64,
    birthday: bool,
    gender: bool,
    occupation: bool,
) -> Result<ProbandInfoQuestionnaire> {
    if load_study(pool, study_id).await?.is_none() {
        return Err(Error::not_found("study", study_id));
    }

    sqlx::query(
        r#"
        INSERT INTO proband_info_questionnaires (study_id, birthday, gender, occupation)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(study_id) DO UPDATE SET
            birthday = excluded.birthday,
            gender = excluded.gender,
            occupation = excluded.occupation
        "#,
    )
    .bind(study_id)
    .bind(birthday)
    .bind(gender)
    .bind(occupation)
    .execute(pool)
    .await?;

    load_proband_info_questionnaire(pool, study_id)
        .await?
        .ok_or_else(|| Error::Internal("proband info questionnaire vanished after insert".into()))
}

/// Load the proband-info questionnaire of a study
pub async fn load_proband_info_questionnaire<'e, E>(
    executor: E,
    study_id: i64,
) -> Result<Option<ProbandInfoQuestionnaire>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, study_id, birthday, gender, occupation
        FROM proband_info_questionnaires
        WHERE study_id = ?
        "#,
    )
    .bind(study_id)
    .fetch_optional(executor)
    .await?;

    match row {
        Some(row) => Ok(Some(ProbandInfoQuestionnaire {
            id: row.try_get("id")?,
            study_id: row.try_get("study_id")?,
            birthday: row.try_get("birthday")?,
            gender: row.try_get("gender")?,
            occupation: row.try_get("occupation")?,
        })),
        None => Ok(None),
    }
}

//! Questionnaire submission persistence
//!
//! Each submission is one `questionnaire_answers` row owning sensor value
//! cells and answer rows. Answer rows live in one table per question kind
//! (see [`QuestionKind::answer_table`]).

use chrono::NaiveDateTime;
use mindrate_common::models::{AnswerRow, AnswerValue, QuestionKind, QuestionnaireAnswer, SensorValueCell};
use mindrate_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

pub async fn create_questionnaire_answer<'e, E>(
    executor: E,
    proband_id: i64,
    questionnaire_id: i64,
    submitted_at: NaiveDateTime,
) -> Result<QuestionnaireAnswer>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query(
        "INSERT INTO questionnaire_answers (proband_id, questionnaire_id, submitted_at) VALUES (?, ?, ?)",
    )
    .bind(proband_id)
    .bind(questionnaire_id)
    .bind(submitted_at)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(QuestionnaireAnswer {
        id,
        proband_id,
        questionnaire_id,
        submitted_at,
    })
}

pub async fn add_sensor_value<'e, E>(
    executor: E,
    questionnaire_answer_id: i64,
    sensor: &str,
    value: f64,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query(
        "INSERT INTO sensor_value_cells (questionnaire_answer_id, sensor, value) VALUES (?, ?, ?)",
    )
    .bind(questionnaire_answer_id)
    .bind(sensor)
    .bind(value)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn list_sensor_values<'e, E>(
    executor: E,
    questionnaire_answer_id: i64,
) -> Result<Vec<SensorValueCell>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, questionnaire_answer_id, sensor, value
        FROM sensor_value_cells
        WHERE questionnaire_answer_id = ?
        ORDER BY id
        "#,
    )
    .bind(questionnaire_answer_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SensorValueCell {
                id: row.try_get("id")?,
                questionnaire_answer_id: row.try_get("questionnaire_answer_id")?,
                sensor: row.try_get("sensor")?,
                value: row.try_get("value")?,
            })
        })
        .collect()
}

/// Insert one answer row into the table of its kind
pub async fn add_answer<'e, E>(
    executor: E,
    questionnaire_answer_id: i64,
    question_id: i64,
    value: &AnswerValue,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "INSERT INTO {} (questionnaire_answer_id, question_id, value) VALUES (?, ?, ?)",
        value.kind().answer_table()
    );
    let query = sqlx::query(&sql)
        .bind(questionnaire_answer_id)
        .bind(question_id);

    let query = match value {
        AnswerValue::DragScale(v) => query.bind(*v),
        other => query.bind(other.render()),
    };

    Ok(query.execute(executor).await?.last_insert_rowid())
}

/// Read the stored value column as text
fn stored_value(row: &SqliteRow, kind: QuestionKind) -> Result<String> {
    Ok(match kind {
        QuestionKind::DragScale => AnswerValue::DragScale(row.try_get("value")?).render(),
        _ => row.try_get("value")?,
    })
}

/// All answer rows of one submission, grouped by kind
pub async fn list_answer_rows(
    pool: &SqlitePool,
    questionnaire_answer_id: i64,
) -> Result<Vec<AnswerRow>> {
    let mut answers = Vec::new();

    for kind in QuestionKind::ALL {
        let sql = format!(
            "SELECT id, questionnaire_answer_id, question_id, value FROM {} WHERE questionnaire_answer_id = ? ORDER BY id",
            kind.answer_table()
        );
        let rows = sqlx::query(&sql)
            .bind(questionnaire_answer_id)
            .fetch_all(pool)
            .await?;

        for row in &rows {
            answers.push(AnswerRow {
                id: row.try_get("id")?,
                questionnaire_answer_id: row.try_get("questionnaire_answer_id")?,
                question_id: row.try_get("question_id")?,
                kind,
                value: stored_value(row, kind)?,
            });
        }
    }

    Ok(answers)
}

/// Number of answer rows of one kind across a study
pub async fn count_answers(pool: &SqlitePool, study_id: i64, kind: QuestionKind) -> Result<i64> {
    let sql = format!(
        r#"
        SELECT COUNT(*)
        FROM {} a
        JOIN questionnaire_answers qa ON qa.id = a.questionnaire_answer_id
        JOIN questionnaires qn ON qn.id = qa.questionnaire_id
        WHERE qn.study_id = ?
        "#,
        kind.answer_table()
    );

    Ok(sqlx::query_scalar(&sql).bind(study_id).fetch_one(pool).await?)
}

/// Answer row joined with everything a flat report needs
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub study_name: String,
    pub questionnaire_id: i64,
    pub questionnaire_name: String,
    pub proband_id: i64,
    pub questionnaire_answer_id: i64,
    pub question_id: i64,
    pub question_position: i64,
    pub question_text: String,
    pub kind: QuestionKind,
    pub value: String,
    pub submitted_at: NaiveDateTime,
    pub answer_id: i64,
}

/// Every answer of a study, all kinds re-joined
///
/// Sorted by questionnaire, then submission time, then question position.
pub async fn list_answer_records(pool: &SqlitePool, study_id: i64) -> Result<Vec<AnswerRecord>> {
    let mut records = Vec::new();

    for kind in QuestionKind::ALL {
        let sql = format!(
            r#"
            SELECT s.name AS study_name, qn.id AS questionnaire_id, qn.name AS questionnaire_name,
                   qa.proband_id, qa.id AS questionnaire_answer_id, qa.submitted_at,
                   q.id AS question_id, q.position, q.question_text,
                   a.id, a.value
            FROM {} a
            JOIN questionnaire_answers qa ON qa.id = a.questionnaire_answer_id
            JOIN questionnaires qn ON qn.id = qa.questionnaire_id
            JOIN studies s ON s.id = qn.study_id
            JOIN questions q ON q.id = a.question_id
            WHERE s.id = ?
            "#,
            kind.answer_table()
        );
        let rows = sqlx::query(&sql).bind(study_id).fetch_all(pool).await?;

        for row in &rows {
            records.push(AnswerRecord {
                study_name: row.try_get("study_name")?,
                questionnaire_id: row.try_get("questionnaire_id")?,
                questionnaire_name: row.try_get("questionnaire_name")?,
                proband_id: row.try_get("proband_id")?,
                questionnaire_answer_id: row.try_get("questionnaire_answer_id")?,
                question_id: row.try_get("question_id")?,
                question_position: row.try_get("position")?,
                question_text: row.try_get("question_text")?,
                kind,
                value: stored_value(row, kind)?,
                submitted_at: row.try_get("submitted_at")?,
                answer_id: row.try_get("id")?,
            });
        }
    }

    records.sort_by(|a, b| {
        (a.questionnaire_id, a.submitted_at, a.questionnaire_answer_id, a.question_position, a.answer_id)
            .cmp(&(b.questionnaire_id, b.submitted_at, b.questionnaire_answer_id, b.question_position, b.answer_id))
    });

    Ok(records)
}

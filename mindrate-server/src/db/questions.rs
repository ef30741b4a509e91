//! Question and choice option persistence
//!
//! All four question variants share the `questions` table; the `kind`
//! column holds the variant and `min_value`/`max_value` are only set for
//! drag-scale questions.

use mindrate_common::models::{
    ChoiceOption, NewQuestion, Question, QuestionKind, QuestionOwner, QuestionVariant,
};
use mindrate_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

const QUESTION_COLUMNS: &str = "id, questionnaire_id, proband_info_questionnaire_id, kind, \
     position, question_text, show_by_default, min_value, max_value";

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let id: i64 = row.try_get("id")?;
    let questionnaire_id: Option<i64> = row.try_get("questionnaire_id")?;
    let proband_info_id: Option<i64> = row.try_get("proband_info_questionnaire_id")?;
    let kind: QuestionKind = row.try_get::<String, _>("kind")?.parse()?;

    let owner = match (questionnaire_id, proband_info_id) {
        (Some(q), None) => QuestionOwner::Questionnaire(q),
        (None, Some(p)) => QuestionOwner::ProbandInfo(p),
        _ => {
            return Err(Error::Internal(format!(
                "question {} does not have exactly one owner",
                id
            )))
        }
    };

    let variant = match kind {
        QuestionKind::Text => QuestionVariant::Text,
        QuestionKind::SingleChoice => QuestionVariant::SingleChoice,
        QuestionKind::MultiChoice => QuestionVariant::MultiChoice,
        QuestionKind::DragScale => QuestionVariant::DragScale {
            min_value: row.try_get::<Option<f64>, _>("min_value")?.unwrap_or(0.0),
            max_value: row.try_get::<Option<f64>, _>("max_value")?.unwrap_or(0.0),
        },
    };

    Ok(Question {
        id,
        owner,
        position: row.try_get("position")?,
        text: row.try_get("question_text")?,
        show_by_default: row.try_get("show_by_default")?,
        variant,
    })
}

fn owner_columns(owner: QuestionOwner) -> (Option<i64>, Option<i64>) {
    match owner {
        QuestionOwner::Questionnaire(id) => (Some(id), None),
        QuestionOwner::ProbandInfo(id) => (None, Some(id)),
    }
}

/// Create a question at a free position of its owner
pub async fn create_question(pool: &SqlitePool, question: &NewQuestion) -> Result<Question> {
    if let QuestionVariant::DragScale {
        min_value,
        max_value,
    } = question.variant
    {
        if !(min_value < max_value) {
            return Err(Error::InvalidInput(format!(
                "drag scale range [{}, {}] is empty",
                min_value, max_value
            )));
        }
    }

    let (questionnaire_id, proband_info_id) = owner_columns(question.owner);

    let owner_exists: Option<i64> = match question.owner {
        QuestionOwner::Questionnaire(id) => {
            sqlx::query_scalar("SELECT id FROM questionnaires WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        QuestionOwner::ProbandInfo(id) => {
            sqlx::query_scalar("SELECT id FROM proband_info_questionnaires WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
    };
    if owner_exists.is_none() {
        return Err(Error::NotFound(format!("question owner {:?}", question.owner)));
    }

    let taken = list_questions(pool, question.owner)
        .await?
        .iter()
        .any(|q| q.position == question.position);
    if taken {
        return Err(Error::Conflict(format!(
            "position {} is already used in {:?}",
            question.position, question.owner
        )));
    }

    let (min_value, max_value) = match question.variant {
        QuestionVariant::DragScale {
            min_value,
            max_value,
        } => (Some(min_value), Some(max_value)),
        _ => (None, None),
    };

    let id = sqlx::query(
        r#"
        INSERT INTO questions (
            questionnaire_id, proband_info_questionnaire_id, kind, position,
            question_text, show_by_default, min_value, max_value
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(questionnaire_id)
    .bind(proband_info_id)
    .bind(question.variant.kind().code())
    .bind(question.position)
    .bind(&question.text)
    .bind(question.show_by_default)
    .bind(min_value)
    .bind(max_value)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Question {
        id,
        owner: question.owner,
        position: question.position,
        text: question.text.clone(),
        show_by_default: question.show_by_default,
        variant: question.variant.clone(),
    })
}

/// Load question by id
pub async fn load_question<'e, E>(executor: E, question_id: i64) -> Result<Option<Question>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM questions WHERE id = ?", QUESTION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(question_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(question_from_row).transpose()
}

/// Questions of one owner ordered by display position
pub async fn list_questions<'e, E>(executor: E, owner: QuestionOwner) -> Result<Vec<Question>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let filter = match owner {
        QuestionOwner::Questionnaire(_) => "questionnaire_id",
        QuestionOwner::ProbandInfo(_) => "proband_info_questionnaire_id",
    };
    let owner_id = match owner {
        QuestionOwner::Questionnaire(id) | QuestionOwner::ProbandInfo(id) => id,
    };

    let sql = format!(
        "SELECT {} FROM questions WHERE {} = ? ORDER BY position, id",
        QUESTION_COLUMNS, filter
    );
    let rows = sqlx::query(&sql)
        .bind(owner_id)
        .fetch_all(executor)
        .await?;

    rows.iter().map(question_from_row).collect()
}

/// Attach an option to a single- or multi-choice question
pub async fn add_choice_option(
    pool: &SqlitePool,
    question_id: i64,
    text: &str,
    next_question_position: Option<i64>,
) -> Result<ChoiceOption> {
    let question = load_question(pool, question_id)
        .await?
        .ok_or_else(|| Error::not_found("question", question_id))?;

    if !question.kind().has_options() {
        return Err(Error::InvalidInput(format!(
            "{} question {} cannot carry options",
            question.kind(),
            question_id
        )));
    }

    let id = sqlx::query(
        "INSERT INTO choice_options (question_id, choice_text, next_question_position) VALUES (?, ?, ?)",
    )
    .bind(question_id)
    .bind(text)
    .bind(next_question_position)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(ChoiceOption {
        id,
        question_id,
        text: text.to_string(),
        next_question_position,
    })
}

/// Options of a question in insertion order
pub async fn list_choice_options<'e, E>(executor: E, question_id: i64) -> Result<Vec<ChoiceOption>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, question_id, choice_text, next_question_position
        FROM choice_options
        WHERE question_id = ?
        ORDER BY id
        "#,
    )
    .bind(question_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ChoiceOption {
                id: row.try_get("id")?,
                question_id: row.try_get("question_id")?,
                text: row.try_get("choice_text")?,
                next_question_position: row.try_get("next_question_position")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::questionnaires::create_questionnaire;
    use crate::db::studies::create_study;
    use chrono::NaiveDate;
    use mindrate_common::db::init_memory_database;
    use mindrate_common::models::{NewQuestionnaire, NewStudy, TriggerConditions};

    async fn setup_questionnaire(pool: &SqlitePool) -> i64 {
        let when = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let study = create_study(
            pool,
            &NewStudy {
                owner: "anna@uni.de".into(),
                name: "Focus".into(),
                start_date_time: when,
                end_date_time: when,
            },
        )
        .await
        .unwrap();
        let (questionnaire, _) = create_questionnaire(
            pool,
            &NewQuestionnaire {
                study_id: study.id,
                name: "Daily".into(),
                due_after: None,
                max_trigger_times_per_day: 1,
            },
            &TriggerConditions::default(),
        )
        .await
        .unwrap();
        questionnaire.id
    }

    fn question(owner: QuestionOwner, position: i64, variant: QuestionVariant) -> NewQuestion {
        NewQuestion {
            owner,
            position,
            text: format!("Question {}", position),
            show_by_default: true,
            variant,
        }
    }

    #[tokio::test]
    async fn test_questions_listed_by_position() {
        let pool = init_memory_database().await.unwrap();
        let owner = QuestionOwner::Questionnaire(setup_questionnaire(&pool).await);

        create_question(&pool, &question(owner, 3, QuestionVariant::Text)).await.unwrap();
        create_question(&pool, &question(owner, 1, QuestionVariant::MultiChoice)).await.unwrap();
        create_question(
            &pool,
            &question(
                owner,
                2,
                QuestionVariant::DragScale {
                    min_value: 0.0,
                    max_value: 10.0,
                },
            ),
        )
        .await
        .unwrap();

        let questions = list_questions(&pool, owner).await.unwrap();
        let positions: Vec<i64> = questions.iter().map(|q| q.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(
            questions[1].variant,
            QuestionVariant::DragScale {
                min_value: 0.0,
                max_value: 10.0
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_position_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        let owner = QuestionOwner::Questionnaire(setup_questionnaire(&pool).await);

        create_question(&pool, &question(owner, 1, QuestionVariant::Text)).await.unwrap();
        let err = create_question(&pool, &question(owner, 1, QuestionVariant::SingleChoice))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_empty_drag_scale_range_rejected() {
        let pool = init_memory_database().await.unwrap();
        let owner = QuestionOwner::Questionnaire(setup_questionnaire(&pool).await);

        let err = create_question(
            &pool,
            &question(
                owner,
                1,
                QuestionVariant::DragScale {
                    min_value: 5.0,
                    max_value: 5.0,
                },
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_options_only_on_choice_questions() {
        let pool = init_memory_database().await.unwrap();
        let owner = QuestionOwner::Questionnaire(setup_questionnaire(&pool).await);

        let text = create_question(&pool, &question(owner, 1, QuestionVariant::Text)).await.unwrap();
        let choice = create_question(&pool, &question(owner, 2, QuestionVariant::SingleChoice))
            .await
            .unwrap();

        assert!(add_choice_option(&pool, text.id, "yes", None).await.is_err());

        add_choice_option(&pool, choice.id, "yes", Some(1)).await.unwrap();
        add_choice_option(&pool, choice.id, "no", None).await.unwrap();

        let options = list_choice_options(&pool, choice.id).await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].text, "yes");
        assert_eq!(options[0].next_question_position, Some(1));
        assert_eq!(options[1].next_question_position, None);
    }

    #[tokio::test]
    async fn test_question_for_missing_owner_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = create_question(
            &pool,
            &question(QuestionOwner::ProbandInfo(77), 1, QuestionVariant::Text),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

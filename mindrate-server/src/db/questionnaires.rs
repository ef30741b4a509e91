//! Questionnaire and trigger event persistence
//!
//! A questionnaire is always created together with its trigger event so the
//! one-to-one relation holds from the first commit on.

use chrono::{NaiveDateTime, NaiveTime};
use mindrate_common::models::{
    Activity, NewQuestionnaire, Questionnaire, SensorLevel, TriggerConditions, TriggerEvent,
};
use mindrate_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use super::studies::load_study;

fn questionnaire_from_row(row: &SqliteRow) -> Result<Questionnaire> {
    Ok(Questionnaire {
        id: row.try_get("id")?,
        study_id: row.try_get("study_id")?,
        name: row.try_get("name")?,
        due_after: row.try_get("due_after_seconds")?,
        max_trigger_times_per_day: row.try_get("max_trigger_times_per_day")?,
    })
}

fn parse_level(code: Option<String>) -> Result<Option<SensorLevel>> {
    code.map(|c| c.parse()).transpose()
}

fn trigger_event_from_row(row: &SqliteRow) -> Result<TriggerEvent> {
    let datetime: Option<NaiveDateTime> = row.try_get("datetime")?;
    let time: Option<NaiveTime> = row.try_get("time")?;
    let activity: Option<String> = row.try_get("activity")?;

    Ok(TriggerEvent {
        id: row.try_get("id")?,
        questionnaire_id: row.try_get("questionnaire_id")?,
        conditions: TriggerConditions {
            min_time_space: row.try_get("min_time_space_seconds")?,
            datetime,
            time,
            light: parse_level(row.try_get("light")?)?,
            relative_humidity: parse_level(row.try_get("relative_humidity")?)?,
            temperature: parse_level(row.try_get("temperature")?)?,
            air_pressure: parse_level(row.try_get("air_pressure")?)?,
            proximity: parse_level(row.try_get("proximity")?)?,
            activity: activity.map(|a| a.parse::<Activity>()).transpose()?,
        },
    })
}

/// Create a questionnaire and its trigger event in one transaction
pub async fn create_questionnaire(
    pool: &SqlitePool,
    questionnaire: &NewQuestionnaire,
    trigger: &TriggerConditions,
) -> Result<(Questionnaire, TriggerEvent)> {
    if load_study(pool, questionnaire.study_id).await?.is_none() {
        return Err(Error::not_found("study", questionnaire.study_id));
    }
    if questionnaire.max_trigger_times_per_day < 0 {
        return Err(Error::InvalidInput(
            "max_trigger_times_per_day must not be negative".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    let questionnaire_id = sqlx::query(
        r#"
        INSERT INTO questionnaires (study_id, name, due_after_seconds, max_trigger_times_per_day)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(questionnaire.study_id)
    .bind(&questionnaire.name)
    .bind(questionnaire.due_after)
    .bind(questionnaire.max_trigger_times_per_day)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let trigger_id = sqlx::query(
        r#"
        INSERT INTO trigger_events (
            questionnaire_id, min_time_space_seconds, datetime, time,
            light, relative_humidity, temperature, air_pressure, proximity, activity
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(questionnaire_id)
    .bind(trigger.min_time_space)
    .bind(trigger.datetime)
    .bind(trigger.time)
    .bind(trigger.light.map(SensorLevel::code))
    .bind(trigger.relative_humidity.map(SensorLevel::code))
    .bind(trigger.temperature.map(SensorLevel::code))
    .bind(trigger.air_pressure.map(SensorLevel::code))
    .bind(trigger.proximity.map(SensorLevel::code))
    .bind(trigger.activity.map(Activity::code))
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;

    Ok((
        Questionnaire {
            id: questionnaire_id,
            study_id: questionnaire.study_id,
            name: questionnaire.name.clone(),
            due_after: questionnaire.due_after,
            max_trigger_times_per_day: questionnaire.max_trigger_times_per_day,
        },
        TriggerEvent {
            id: trigger_id,
            questionnaire_id,
            conditions: trigger.clone(),
        },
    ))
}

/// Load questionnaire by id
pub async fn load_questionnaire<'e, E>(
    executor: E,
    questionnaire_id: i64,
) -> Result<Option<Questionnaire>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, study_id, name, due_after_seconds, max_trigger_times_per_day
        FROM questionnaires
        WHERE id = ?
        "#,
    )
    .bind(questionnaire_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(questionnaire_from_row).transpose()
}

/// Questionnaires of a study in creation order
pub async fn list_questionnaires<'e, E>(executor: E, study_id: i64) -> Result<Vec<Questionnaire>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, study_id, name, due_after_seconds, max_trigger_times_per_day
        FROM questionnaires
        WHERE study_id = ?
        ORDER BY id
        "#,
    )
    .bind(study_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(questionnaire_from_row).collect()
}

/// Load the trigger event of a questionnaire
pub async fn load_trigger_event<'e, E>(
    executor: E,
    questionnaire_id: i64,
) -> Result<Option<TriggerEvent>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, questionnaire_id, min_time_space_seconds, datetime, time,
               light, relative_humidity, temperature, air_pressure, proximity, activity
        FROM trigger_events
        WHERE questionnaire_id = ?
        "#,
    )
    .bind(questionnaire_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(trigger_event_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::studies::create_study;
    use chrono::NaiveDate;
    use mindrate_common::db::init_memory_database;
    use mindrate_common::models::NewStudy;

    async fn setup_study(pool: &SqlitePool) -> i64 {
        let when = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        create_study(
            pool,
            &NewStudy {
                owner: "anna@uni.de".into(),
                name: "Stress".into(),
                start_date_time: when,
                end_date_time: when,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_trigger_event_round_trips_all_conditions() {
        let pool = init_memory_database().await.unwrap();
        let study_id = setup_study(&pool).await;

        let conditions = TriggerConditions {
            min_time_space: 1800,
            datetime: NaiveDate::from_ymd_opt(2026, 2, 3)
                .unwrap()
                .and_hms_opt(9, 15, 0),
            time: NaiveTime::from_hms_opt(18, 5, 30),
            light: Some(SensorLevel::Medium),
            relative_humidity: None,
            temperature: Some(SensorLevel::VeryHigh),
            air_pressure: None,
            proximity: Some(SensorLevel::Low),
            activity: Some(Activity::Walking),
        };

        let (questionnaire, _) = create_questionnaire(
            &pool,
            &NewQuestionnaire {
                study_id,
                name: "Evening".into(),
                due_after: Some(3600),
                max_trigger_times_per_day: 3,
            },
            &conditions,
        )
        .await
        .unwrap();

        let trigger = load_trigger_event(&pool, questionnaire.id)
            .await
            .unwrap()
            .expect("trigger event stored");
        assert_eq!(trigger.conditions, conditions);

        let loaded = load_questionnaire(&pool, questionnaire.id).await.unwrap().unwrap();
        assert_eq!(loaded.due_after, Some(3600));
        assert_eq!(loaded.max_trigger_times_per_day, 3);
    }

    #[tokio::test]
    async fn test_questionnaire_for_missing_study_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = create_questionnaire(
            &pool,
            &NewQuestionnaire {
                study_id: 42,
                name: "Ghost".into(),
                due_after: None,
                max_trigger_times_per_day: 1,
            },
            &TriggerConditions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_questionnaires_in_creation_order() {
        let pool = init_memory_database().await.unwrap();
        let study_id = setup_study(&pool).await;

        for name in ["Morning", "Noon", "Evening"] {
            create_questionnaire(
                &pool,
                &NewQuestionnaire {
                    study_id,
                    name: name.into(),
                    due_after: None,
                    max_trigger_times_per_day: 1,
                },
                &TriggerConditions::default(),
            )
            .await
            .unwrap();
        }

        let names: Vec<String> = list_questionnaires(&pool, study_id)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.name)
            .collect();
        assert_eq!(names, vec!["Morning", "Noon", "Evening"]);
    }
}

//! Shared fixture: one study with a proband-info questionnaire and two
//! questionnaires, built on an in-memory database.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use mindrate_common::db::init_memory_database;
use mindrate_common::models::{
    NewQuestion, NewQuestionnaire, NewStudy, QuestionOwner, QuestionVariant, SensorLevel,
    TriggerConditions,
};
use mindrate_server::db;
use sqlx::SqlitePool;

pub struct Fixture {
    pub pool: SqlitePool,
    pub study_id: i64,
    pub proband_info_id: i64,
    pub hobby_question: i64,
    pub evening_id: i64,
    pub morning_id: i64,
    /// Evening questions by position 1..=4
    pub tired_question: i64,
    pub note_question: i64,
    pub colors_question: i64,
    pub scale_question: i64,
}

fn question(owner: QuestionOwner, position: i64, text: &str, variant: QuestionVariant) -> NewQuestion {
    NewQuestion {
        owner,
        position,
        text: text.to_string(),
        show_by_default: position == 1,
        variant,
    }
}

pub async fn setup() -> Fixture {
    let pool = init_memory_database().await.expect("in-memory database");

    let study = db::create_study(
        &pool,
        &NewStudy {
            owner: "anna@uni.de".into(),
            name: "Sleep Study".into(),
            start_date_time: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            end_date_time: NaiveDate::from_ymd_opt(2026, 6, 30)
                .unwrap()
                .and_hms_opt(20, 15, 30)
                .unwrap(),
        },
    )
    .await
    .unwrap();

    let info = db::set_proband_info_questionnaire(&pool, study.id, true, true, false)
        .await
        .unwrap();
    let hobby = db::create_question(
        &pool,
        &question(
            QuestionOwner::ProbandInfo(info.id),
            1,
            "Favourite hobby?",
            QuestionVariant::Text,
        ),
    )
    .await
    .unwrap();

    let (evening, _) = db::create_questionnaire(
        &pool,
        &NewQuestionnaire {
            study_id: study.id,
            name: "Evening".into(),
            due_after: None,
            max_trigger_times_per_day: 2,
        },
        &TriggerConditions {
            min_time_space: 3600,
            time: NaiveTime::from_hms_opt(20, 0, 0),
            light: Some(SensorLevel::Medium),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (morning, _) = db::create_questionnaire(
        &pool,
        &NewQuestionnaire {
            study_id: study.id,
            name: "Morning".into(),
            due_after: Some(1800),
            max_trigger_times_per_day: 1,
        },
        &TriggerConditions::default(),
    )
    .await
    .unwrap();

    let owner = QuestionOwner::Questionnaire(evening.id);
    let tired = db::create_question(&pool, &question(owner, 1, "Are you tired?", QuestionVariant::SingleChoice))
        .await
        .unwrap();
    let note = db::create_question(&pool, &question(owner, 2, "Why?", QuestionVariant::Text))
        .await
        .unwrap();
    let colors = db::create_question(&pool, &question(owner, 3, "Colors seen today", QuestionVariant::MultiChoice))
        .await
        .unwrap();
    let scale = db::create_question(
        &pool,
        &question(
            owner,
            4,
            "Stress level",
            QuestionVariant::DragScale {
                min_value: 0.0,
                max_value: 10.0,
            },
        ),
    )
    .await
    .unwrap();

    db::add_choice_option(&pool, tired.id, "yes", Some(2)).await.unwrap();
    db::add_choice_option(&pool, tired.id, "no", Some(9)).await.unwrap();
    for color in ["red", "green", "blue"] {
        db::add_choice_option(&pool, colors.id, color, None).await.unwrap();
    }

    Fixture {
        pool,
        study_id: study.id,
        proband_info_id: info.id,
        hobby_question: hobby.id,
        evening_id: evening.id,
        morning_id: morning.id,
        tired_question: tired.id,
        note_question: note.id,
        colors_question: colors.id,
        scale_question: scale.id,
    }
}

//! Study download document
//!
//! Renders a study's schema into the JSON layout the mobile client parses.
//! Field names are fixed by the client; ids are sent as decimal strings.

use std::collections::HashMap;

use chrono::Timelike;
use mindrate_common::models::{
    ChoiceOption, ProbandInfoQuestionnaire, Question, QuestionOwner, QuestionVariant,
    Questionnaire, Sensor, TriggerConditions,
};
use mindrate_common::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::info;

use super::sensor_ranges::sensor_range;
use crate::db;
use crate::wire::{id_string, DateParts};

/// Duration reported for questionnaires without `due_after`
pub const UNLIMITED_DURATION_SECONDS: i64 = 999_999_999;

#[derive(Debug, Clone, Serialize)]
pub struct StudyDocument {
    pub study: StudyBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyBody {
    #[serde(rename = "probandID")]
    pub proband_id: String,
    pub study_id: String,
    pub study_name: String,
    pub beginning_date: DateParts,
    pub end_date: DateParts,
    pub proband_info_questionnaire: ProbandInfoBody,
    pub questionnaires: Vec<QuestionnaireBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbandInfoBody {
    pub birthday: bool,
    pub gender: bool,
    pub occupation: bool,
    pub questions: Vec<QuestionBody>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireBody {
    #[serde(rename = "questionnaireID")]
    pub questionnaire_id: String,
    pub questionnaire_name: String,
    pub max_show_up_times_per_day: i64,
    pub duration: DurationBody,
    pub trigger_event: TriggerEventBody,
    pub questions: Vec<QuestionBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationBody {
    pub second: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEventBody {
    pub min_time_space: i64,
    pub datetime: Option<DateParts>,
    /// Daily time as unpadded `hour-minute-second`
    pub time: Option<String>,
    /// `<sensor>: bool` plus `<sensor>MinValue`/`<sensor>MaxValue` when enabled
    #[serde(flatten)]
    pub sensors: Map<String, Value>,
    pub activity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBody {
    #[serde(rename = "questionID")]
    pub question_id: String,
    pub question_type: String,
    pub question_content: String,
    pub show_by_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionBody {
    pub option_content: String,
    /// Empty when the option has no follow-up
    #[serde(rename = "nextQuestionID")]
    pub next_question_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDocument {
    #[serde(rename = "questionnaireID")]
    pub questionnaire_id: String,
    pub questionnaire_name: String,
    pub questions: Vec<QuestionBody>,
}

/// Id of the sibling question sitting at `position`, or `""`
pub fn resolve_next_question_id(siblings: &[Question], position: Option<i64>) -> String {
    position
        .and_then(|pos| siblings.iter().find(|q| q.position == pos))
        .map(|q| id_string(q.id))
        .unwrap_or_default()
}

/// Render an ordered question list with options keyed by question id
pub fn render_questions(
    questions: &[Question],
    options: &HashMap<i64, Vec<ChoiceOption>>,
) -> Vec<QuestionBody> {
    questions
        .iter()
        .map(|question| {
            let rendered_options = question.kind().has_options().then(|| {
                options
                    .get(&question.id)
                    .map(|opts| opts.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .map(|option| OptionBody {
                        option_content: option.text.clone(),
                        next_question_id: resolve_next_question_id(
                            questions,
                            option.next_question_position,
                        ),
                    })
                    .collect()
            });

            let (min_value, max_value) = match question.variant {
                QuestionVariant::DragScale {
                    min_value,
                    max_value,
                } => (Some(min_value), Some(max_value)),
                _ => (None, None),
            };

            QuestionBody {
                question_id: id_string(question.id),
                question_type: question.kind().wire_tag().to_string(),
                question_content: question.text.clone(),
                show_by_default: question.show_by_default,
                options: rendered_options,
                min_value,
                max_value,
            }
        })
        .collect()
}

/// Time, sensor and activity conditions in client layout
pub fn render_trigger_event(conditions: &TriggerConditions) -> TriggerEventBody {
    let mut sensors = Map::new();

    for sensor in Sensor::ALL {
        let name = sensor.wire_name();
        match conditions.sensor_level(sensor) {
            Some(level) => {
                let range = sensor_range(sensor, level);
                sensors.insert(name.to_string(), Value::Bool(true));
                sensors.insert(format!("{}MinValue", name), Value::from(range.min));
                sensors.insert(format!("{}MaxValue", name), Value::from(range.max));
            }
            None => {
                sensors.insert(name.to_string(), Value::Bool(false));
            }
        }
    }

    TriggerEventBody {
        min_time_space: conditions.min_time_space,
        datetime: conditions.datetime.map(DateParts::from),
        time: conditions
            .time
            .map(|t| format!("{}-{}-{}", t.hour(), t.minute(), t.second())),
        sensors,
        activity: conditions.activity.is_some(),
        activity_type: conditions.activity.map(|a| a.code().to_string()),
    }
}

/// Load questions of an owner plus the options of its choice questions
async fn load_question_list(
    pool: &SqlitePool,
    owner: QuestionOwner,
) -> Result<(Vec<Question>, HashMap<i64, Vec<ChoiceOption>>)> {
    let questions = db::list_questions(pool, owner).await?;

    let mut options = HashMap::new();
    for question in questions.iter().filter(|q| q.kind().has_options()) {
        options.insert(question.id, db::list_choice_options(pool, question.id).await?);
    }

    Ok((questions, options))
}

async fn render_owner_questions(pool: &SqlitePool, owner: QuestionOwner) -> Result<Vec<QuestionBody>> {
    let (questions, options) = load_question_list(pool, owner).await?;
    Ok(render_questions(&questions, &options))
}

async fn render_questionnaire(
    pool: &SqlitePool,
    questionnaire: &Questionnaire,
) -> Result<QuestionnaireBody> {
    let trigger = db::load_trigger_event(pool, questionnaire.id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("trigger event of questionnaire {}", questionnaire.id))
        })?;

    Ok(QuestionnaireBody {
        questionnaire_id: id_string(questionnaire.id),
        questionnaire_name: questionnaire.name.clone(),
        max_show_up_times_per_day: questionnaire.max_trigger_times_per_day,
        duration: DurationBody {
            second: questionnaire.due_after.unwrap_or(UNLIMITED_DURATION_SECONDS),
        },
        trigger_event: render_trigger_event(&trigger.conditions),
        questions: render_owner_questions(pool, QuestionOwner::Questionnaire(questionnaire.id))
            .await?,
    })
}

fn render_proband_info(
    info: &ProbandInfoQuestionnaire,
    questions: Vec<QuestionBody>,
) -> ProbandInfoBody {
    ProbandInfoBody {
        birthday: info.birthday,
        gender: info.gender,
        occupation: info.occupation,
        questions,
    }
}

/// Render the download document of a study
///
/// Registers a new proband for the study once every lookup succeeded, so a
/// failed download leaves no orphan proband behind.
pub async fn render_study_document(pool: &SqlitePool, study_id: i64) -> Result<StudyDocument> {
    let study = db::load_study(pool, study_id)
        .await?
        .ok_or_else(|| Error::not_found("study", study_id))?;

    let proband_info = db::load_proband_info_questionnaire(pool, study_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proband info questionnaire of study {}", study_id)))?;

    let info_questions =
        render_owner_questions(pool, QuestionOwner::ProbandInfo(proband_info.id)).await?;

    let mut questionnaires = Vec::new();
    for questionnaire in db::list_questionnaires(pool, study_id).await? {
        questionnaires.push(render_questionnaire(pool, &questionnaire).await?);
    }

    let proband = db::create_proband(pool, study_id).await?;
    info!(
        "Study {} downloaded by new proband {} ({} questionnaires)",
        study_id,
        proband.id,
        questionnaires.len()
    );

    Ok(StudyDocument {
        study: StudyBody {
            proband_id: id_string(proband.id),
            study_id: id_string(study.id),
            study_name: study.name,
            beginning_date: study.start_date_time.into(),
            end_date: study.end_date_time.into(),
            proband_info_questionnaire: render_proband_info(&proband_info, info_questions),
            questionnaires,
        },
    })
}

/// Ordered question list of one questionnaire, without side effects
pub async fn render_questionnaire_preview(
    pool: &SqlitePool,
    questionnaire_id: i64,
) -> Result<PreviewDocument> {
    let questionnaire = db::load_questionnaire(pool, questionnaire_id)
        .await?
        .ok_or_else(|| Error::not_found("questionnaire", questionnaire_id))?;

    Ok(PreviewDocument {
        questionnaire_id: id_string(questionnaire.id),
        questionnaire_name: questionnaire.name,
        questions: render_owner_questions(pool, QuestionOwner::Questionnaire(questionnaire_id))
            .await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use mindrate_common::models::{Activity, SensorLevel};

    fn question(id: i64, position: i64, variant: QuestionVariant) -> Question {
        Question {
            id,
            owner: QuestionOwner::Questionnaire(1),
            position,
            text: format!("Q{}", id),
            show_by_default: position == 1,
            variant,
        }
    }

    fn option(question_id: i64, text: &str, next: Option<i64>) -> ChoiceOption {
        ChoiceOption {
            id: 0,
            question_id,
            text: text.to_string(),
            next_question_position: next,
        }
    }

    #[test]
    fn test_next_question_resolved_by_position() {
        let questions = vec![
            question(10, 1, QuestionVariant::SingleChoice),
            question(20, 2, QuestionVariant::Text),
            question(30, 3, QuestionVariant::Text),
        ];
        let mut options = HashMap::new();
        options.insert(
            10,
            vec![option(10, "yes", Some(2)), option(10, "no", Some(7)), option(10, "skip", None)],
        );

        let rendered = render_questions(&questions, &options);
        let opts = rendered[0].options.as_ref().unwrap();

        assert_eq!(opts[0].next_question_id, "20");
        assert_eq!(opts[1].next_question_id, "", "unmatched position has no follow-up");
        assert_eq!(opts[2].next_question_id, "");
    }

    #[test]
    fn test_question_union_tags() {
        let questions = vec![
            question(1, 1, QuestionVariant::Text),
            question(2, 2, QuestionVariant::SingleChoice),
            question(3, 3, QuestionVariant::MultiChoice),
            question(
                4,
                4,
                QuestionVariant::DragScale {
                    min_value: -5.0,
                    max_value: 5.0,
                },
            ),
        ];
        let rendered = render_questions(&questions, &HashMap::new());
        let tags: Vec<&str> = rendered.iter().map(|q| q.question_type.as_str()).collect();
        assert_eq!(tags, vec!["TextAnswer", "SingleChoice", "MultipleChoice", "DragScale"]);

        // Choice questions always carry an options array, others never do
        assert!(rendered[0].options.is_none());
        assert_eq!(rendered[1].options.as_ref().map(Vec::len), Some(0));
        assert_eq!(rendered[3].min_value, Some(-5.0));
        assert_eq!(rendered[3].max_value, Some(5.0));

        let json = serde_json::to_value(&rendered[3]).unwrap();
        assert_eq!(json["questionID"], "4");
        assert_eq!(json["showByDefault"], false);
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_trigger_event_rendering() {
        let conditions = TriggerConditions {
            min_time_space: 600,
            datetime: NaiveDate::from_ymd_opt(2026, 5, 4)
                .unwrap()
                .and_hms_opt(7, 8, 9),
            time: NaiveTime::from_hms_opt(9, 5, 0),
            light: Some(SensorLevel::Medium),
            activity: Some(Activity::InVehicle),
            ..Default::default()
        };

        let json = serde_json::to_value(render_trigger_event(&conditions)).unwrap();

        assert_eq!(json["minTimeSpace"], 600);
        assert_eq!(json["time"], "9-5-0");
        assert_eq!(json["datetime"]["month"], 5);
        assert_eq!(json["datetime"]["second"], 9);
        assert_eq!(json["light"], true);
        assert_eq!(json["lightMinValue"], 50);
        assert_eq!(json["lightMaxValue"], 400);
        assert_eq!(json["pressure"], false);
        assert!(json.get("pressureMinValue").is_none());
        assert_eq!(json["activity"], true);
        assert_eq!(json["activityType"], "in_vehicle");
    }

    #[test]
    fn test_trigger_event_without_conditions() {
        let json = serde_json::to_value(render_trigger_event(&TriggerConditions::default())).unwrap();
        assert!(json["datetime"].is_null());
        assert!(json["time"].is_null());
        assert_eq!(json["activity"], false);
        assert!(json.get("activityType").is_none());
        for sensor in Sensor::ALL {
            assert_eq!(json[sensor.wire_name()], false);
        }
    }
}

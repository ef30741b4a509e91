//! Answer importer
//!
//! Decodes the answer payloads uploaded by the mobile client and writes
//! them as normalized rows. One upload is one of three shapes, all keyed by
//! `probandID`:
//!
//! - `probandInfo`: bare info fields, stored as proband info cells
//! - `probandInfoQuestionnaireAnswers`: answers to the study's custom
//!   proband-info questions, stored as info cells keyed by question text
//! - `questionnaireID` + `answers`: a normal questionnaire submission with an
//!   optional `submitTime` and `sensorValues` snapshot
//!
//! Each upload is written in a single transaction.

use std::collections::{BTreeMap, HashSet};

use chrono::{Local, NaiveDateTime};
use mindrate_common::models::{AnswerValue, Question, QuestionKind, QuestionOwner};
use mindrate_common::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db;
use crate::wire::{DateParts, WireId};

#[derive(Debug, Deserialize)]
struct RawSubmission {
    #[serde(rename = "probandID")]
    proband_id: WireId,
    #[serde(rename = "probandInfo")]
    proband_info: Option<Map<String, Value>>,
    #[serde(rename = "probandInfoQuestionnaireAnswers")]
    proband_info_answers: Option<Vec<RawAnswerItem>>,
    #[serde(rename = "questionnaireID")]
    questionnaire_id: Option<WireId>,
    #[serde(rename = "submitTime")]
    submit_time: Option<DateParts>,
    #[serde(rename = "sensorValues", default)]
    sensor_values: BTreeMap<String, f64>,
    answers: Option<Vec<RawAnswerItem>>,
}

#[derive(Debug, Deserialize)]
struct RawAnswerItem {
    #[serde(rename = "questionID")]
    question_id: WireId,
    #[serde(rename = "questionType")]
    question_type: String,
    answer: Value,
}

/// One answered question, typed by the declared question kind
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerItem {
    pub question_id: i64,
    pub value: AnswerValue,
}

/// Decoded upload
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    ProbandInfo {
        proband_id: i64,
        fields: Vec<(String, String)>,
    },
    ProbandInfoAnswers {
        proband_id: i64,
        answers: Vec<AnswerItem>,
    },
    Questionnaire {
        proband_id: i64,
        questionnaire_id: i64,
        submitted_at: Option<NaiveDateTime>,
        sensor_values: Vec<(String, f64)>,
        answers: Vec<AnswerItem>,
    },
}

/// What an upload created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    ProbandInfo {
        proband_id: i64,
        cells: usize,
    },
    ProbandInfoAnswers {
        proband_id: i64,
        cells: usize,
    },
    Questionnaire {
        proband_id: i64,
        questionnaire_answer_id: i64,
        answers: usize,
    },
}

/// Info values are kept as text; strings are stored unquoted
fn info_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn expect_string(value: Value, question_id: i64) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::InvalidInput(format!(
            "answer to question {} must be a string, got {}",
            question_id, other
        ))),
    }
}

fn parse_answer_value(kind: QuestionKind, value: Value, question_id: i64) -> Result<AnswerValue> {
    match kind {
        QuestionKind::Text => Ok(AnswerValue::Text(expect_string(value, question_id)?)),
        QuestionKind::SingleChoice => {
            Ok(AnswerValue::SingleChoice(expect_string(value, question_id)?))
        }
        QuestionKind::MultiChoice => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| expect_string(item, question_id))
                .collect::<Result<Vec<_>>>()
                .map(AnswerValue::MultiChoice),
            other => Err(Error::InvalidInput(format!(
                "answer to question {} must be a list of options, got {}",
                question_id, other
            ))),
        },
        QuestionKind::DragScale => {
            let number = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            // Finite only: "NaN" and "inf" parse as f64
            number
                .filter(|v: &f64| v.is_finite())
                .map(AnswerValue::DragScale)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "answer to question {} must be a finite number, got {}",
                        question_id, value
                    ))
                })
        }
    }
}

fn parse_answer_item(raw: RawAnswerItem) -> Result<AnswerItem> {
    let question_id = raw.question_id.value()?;
    let kind = QuestionKind::from_wire_tag(&raw.question_type).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown question type: {}", raw.question_type))
    })?;

    Ok(AnswerItem {
        question_id,
        value: parse_answer_value(kind, raw.answer, question_id)?,
    })
}

/// Decode answer items; a question may be answered once per upload
fn parse_answer_items(raw: Vec<RawAnswerItem>) -> Result<Vec<AnswerItem>> {
    let items = raw
        .into_iter()
        .map(parse_answer_item)
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in &items {
        if !seen.insert(item.question_id) {
            return Err(Error::InvalidInput(format!(
                "question {} answered more than once",
                item.question_id
            )));
        }
    }

    Ok(items)
}

/// Decode an upload body without touching the database
pub fn parse_submission(body: &[u8]) -> Result<Submission> {
    let raw: RawSubmission = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Malformed answer payload: {}", e)))?;
    let proband_id = raw.proband_id.value()?;

    if let Some(info) = raw.proband_info {
        let fields = info
            .iter()
            .map(|(key, value)| (key.clone(), info_value_string(value)))
            .collect();
        return Ok(Submission::ProbandInfo { proband_id, fields });
    }

    if let Some(answers) = raw.proband_info_answers {
        return Ok(Submission::ProbandInfoAnswers {
            proband_id,
            answers: parse_answer_items(answers)?,
        });
    }

    let questionnaire_id = raw
        .questionnaire_id
        .ok_or_else(|| {
            Error::InvalidInput(
                "payload has neither probandInfo, probandInfoQuestionnaireAnswers nor questionnaireID"
                    .into(),
            )
        })?
        .value()?;
    let answers = raw
        .answers
        .ok_or_else(|| Error::InvalidInput("missing key: answers".into()))?;

    Ok(Submission::Questionnaire {
        proband_id,
        questionnaire_id,
        submitted_at: raw.submit_time.map(NaiveDateTime::try_from).transpose()?,
        sensor_values: raw.sensor_values.into_iter().collect(),
        answers: parse_answer_items(answers)?,
    })
}

/// Find the referenced question, checking owner and declared kind
async fn resolve_question(
    conn: &mut SqliteConnection,
    item: &AnswerItem,
    owner: QuestionOwner,
) -> Result<Question> {
    let kind = item.value.kind();

    db::load_question(&mut *conn, item.question_id)
        .await?
        .filter(|q| q.owner == owner && q.kind() == kind)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "{} question {} in {:?}",
                kind, item.question_id, owner
            ))
        })
}

/// Decode and store one upload
pub async fn import_answer(pool: &SqlitePool, body: &[u8]) -> Result<ImportOutcome> {
    let submission = parse_submission(body)?;
    import_submission(pool, submission).await
}

/// Store a decoded upload in one transaction
pub async fn import_submission(pool: &SqlitePool, submission: Submission) -> Result<ImportOutcome> {
    let mut tx = pool.begin().await?;

    let outcome = match submission {
        Submission::ProbandInfo { proband_id, fields } => {
            db::load_proband(&mut *tx, proband_id)
                .await?
                .ok_or_else(|| Error::not_found("proband", proband_id))?;

            for (key, value) in &fields {
                db::add_info_cell(&mut *tx, proband_id, key, value).await?;
            }

            ImportOutcome::ProbandInfo {
                proband_id,
                cells: fields.len(),
            }
        }

        Submission::ProbandInfoAnswers {
            proband_id,
            answers,
        } => {
            let proband = db::load_proband(&mut *tx, proband_id)
                .await?
                .ok_or_else(|| Error::not_found("proband", proband_id))?;
            let info = db::load_proband_info_questionnaire(&mut *tx, proband.study_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "proband info questionnaire of study {}",
                        proband.study_id
                    ))
                })?;

            for item in &answers {
                let question =
                    resolve_question(&mut tx, item, QuestionOwner::ProbandInfo(info.id)).await?;
                db::add_info_cell(&mut *tx, proband_id, &question.text, &item.value.render())
                    .await?;
            }

            ImportOutcome::ProbandInfoAnswers {
                proband_id,
                cells: answers.len(),
            }
        }

        Submission::Questionnaire {
            proband_id,
            questionnaire_id,
            submitted_at,
            sensor_values,
            answers,
        } => {
            let proband = db::load_proband(&mut *tx, proband_id)
                .await?
                .ok_or_else(|| Error::not_found("proband", proband_id))?;
            let questionnaire = db::load_questionnaire(&mut *tx, questionnaire_id)
                .await?
                .filter(|q| q.study_id == proband.study_id)
                .ok_or_else(|| Error::not_found("questionnaire", questionnaire_id))?;

            let owner = QuestionOwner::Questionnaire(questionnaire.id);
            for item in &answers {
                resolve_question(&mut tx, item, owner).await?;
            }

            let submitted_at = submitted_at.unwrap_or_else(|| Local::now().naive_local());
            let submission =
                db::create_questionnaire_answer(&mut *tx, proband_id, questionnaire.id, submitted_at)
                    .await?;

            for (sensor, value) in &sensor_values {
                db::add_sensor_value(&mut *tx, submission.id, sensor, *value).await?;
            }
            for item in &answers {
                let row_id = db::add_answer(&mut *tx, submission.id, item.question_id, &item.value)
                    .await?;
                debug!(
                    "Stored {} answer {} for question {}",
                    item.value.kind(),
                    row_id,
                    item.question_id
                );
            }

            db::increment_answer_count(&mut *tx, questionnaire.study_id).await?;

            ImportOutcome::Questionnaire {
                proband_id,
                questionnaire_answer_id: submission.id,
                answers: answers.len(),
            }
        }
    };

    tx.commit().await?;
    info!("Imported upload: {:?}", outcome);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questionnaire_submission() {
        let body = br#"{
            "probandID": "4",
            "questionnaireID": 2,
            "submitTime": {"year": 2026, "month": 4, "day": 1, "hour": 12, "minute": 30, "second": 5},
            "sensorValues": {"light": 120.5, "proximity": 3},
            "answers": [
                {"questionID": "7", "questionType": "TextAnswer", "answer": "tired"},
                {"questionID": "8", "questionType": "MultipleChoice", "answer": ["a", "c"]},
                {"questionID": "9", "questionType": "DragScale", "answer": 6.5},
                {"questionID": "10", "questionType": "SingleChoice", "answer": "no"}
            ]
        }"#;

        let submission = parse_submission(body).unwrap();
        let Submission::Questionnaire {
            proband_id,
            questionnaire_id,
            submitted_at,
            sensor_values,
            answers,
        } = submission
        else {
            panic!("expected questionnaire submission");
        };

        assert_eq!(proband_id, 4);
        assert_eq!(questionnaire_id, 2);
        assert_eq!(
            submitted_at.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2026-04-01 12:30:05"
        );
        assert_eq!(
            sensor_values,
            vec![("light".to_string(), 120.5), ("proximity".to_string(), 3.0)]
        );
        assert_eq!(answers[0].value, AnswerValue::Text("tired".into()));
        assert_eq!(
            answers[1].value,
            AnswerValue::MultiChoice(vec!["a".into(), "c".into()])
        );
        assert_eq!(answers[2].value, AnswerValue::DragScale(6.5));
        assert_eq!(answers[3].value, AnswerValue::SingleChoice("no".into()));
    }

    #[test]
    fn test_parse_bare_proband_info() {
        let body = br#"{"probandID": 3, "probandInfo": {"birthday": "1990-01-02", "gender": "f", "age": 36, "retired": false}}"#;
        let Submission::ProbandInfo { proband_id, fields } = parse_submission(body).unwrap() else {
            panic!("expected proband info");
        };
        assert_eq!(proband_id, 3);
        assert!(fields.contains(&("birthday".to_string(), "1990-01-02".to_string())));
        assert!(fields.contains(&("age".to_string(), "36".to_string())));
        assert!(fields.contains(&("retired".to_string(), "false".to_string())));
    }

    #[test]
    fn test_malformed_json_is_invalid_input() {
        let err = parse_submission(b"{\"probandID\": ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_missing_keys_are_invalid_input() {
        assert!(matches!(
            parse_submission(br#"{"questionnaireID": "1", "answers": []}"#).unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            parse_submission(br#"{"probandID": "1", "questionnaireID": "1"}"#).unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            parse_submission(br#"{"probandID": "1"}"#).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn test_unknown_question_type_rejected() {
        let body = br#"{"probandID": "1", "questionnaireID": "1",
            "answers": [{"questionID": "1", "questionType": "Essay", "answer": "x"}]}"#;
        assert!(matches!(
            parse_submission(body).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn test_answer_of_wrong_json_type_rejected() {
        let body = br#"{"probandID": "1", "questionnaireID": "1",
            "answers": [{"questionID": "1", "questionType": "DragScale", "answer": "loud"}]}"#;
        assert!(parse_submission(body).is_err());

        let body = br#"{"probandID": "1", "questionnaireID": "1",
            "answers": [{"questionID": "1", "questionType": "MultipleChoice", "answer": "a"}]}"#;
        assert!(parse_submission(body).is_err());
    }

    #[test]
    fn test_drag_scale_accepts_numeric_string() {
        let body = br#"{"probandID": "1", "questionnaireID": "1",
            "answers": [{"questionID": "1", "questionType": "DragScale", "answer": " 42 "}]}"#;
        let Submission::Questionnaire { answers, .. } = parse_submission(body).unwrap() else {
            panic!("expected questionnaire submission");
        };
        assert_eq!(answers[0].value, AnswerValue::DragScale(42.0));
    }

    #[test]
    fn test_drag_scale_rejects_non_finite_strings() {
        for answer in ["NaN", "nan", "inf", "-infinity"] {
            let body = format!(
                r#"{{"probandID": "1", "questionnaireID": "1",
                "answers": [{{"questionID": "1", "questionType": "DragScale", "answer": "{}"}}]}}"#,
                answer
            );
            assert!(
                matches!(parse_submission(body.as_bytes()), Err(Error::InvalidInput(_))),
                "{} accepted",
                answer
            );
        }
    }

    #[test]
    fn test_question_answered_twice_rejected() {
        let body = br#"{"probandID": "1", "questionnaireID": "1",
            "answers": [
                {"questionID": "5", "questionType": "TextAnswer", "answer": "a"},
                {"questionID": 5, "questionType": "TextAnswer", "answer": "b"}
            ]}"#;
        assert!(matches!(
            parse_submission(body).unwrap_err(),
            Error::InvalidInput(_)
        ));

        let body = br#"{"probandID": "1", "probandInfoQuestionnaireAnswers": [
                {"questionID": "2", "questionType": "TextAnswer", "answer": "a"},
                {"questionID": "2", "questionType": "TextAnswer", "answer": "a"}
            ]}"#;
        assert!(matches!(
            parse_submission(body).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }
}

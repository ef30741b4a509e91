//! CSV reports for study directors
//!
//! - `study_answer.csv`: one row per answer, all kinds re-joined
//! - `proband_info.csv`: proband info cells pivoted into columns
//! - `study_data.csv`: the questionnaire schema of the studies

use std::collections::{BTreeMap, BTreeSet, HashSet};

use mindrate_common::models::{QuestionOwner, Study};
use mindrate_common::{Error, Result};
use sqlx::SqlitePool;

use crate::db;

pub const STUDY_DATA_FILE: &str = "study_data.csv";
pub const STUDY_ANSWER_FILE: &str = "study_answer.csv";
pub const PROBAND_INFO_FILE: &str = "proband_info.csv";

const ANSWER_HEADER: [&str; 7] = [
    "study",
    "questionnaire",
    "proband",
    "question",
    "question_type",
    "answer",
    "time",
];

const STUDY_DATA_HEADER: [&str; 6] = [
    "study",
    "questionnaire",
    "position",
    "question_type",
    "question",
    "options",
];

const PROBAND_INFO_FIXED_COLUMNS: [&str; 2] = ["study", "proband"];

fn csv_error(err: impl std::fmt::Display) -> Error {
    Error::Internal(format!("CSV encoding failed: {}", err))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(csv_error)
}

/// Selected studies, or every study when the selection is empty
///
/// A study named more than once is exported once, at its first position.
async fn select_studies(pool: &SqlitePool, study_ids: &[i64]) -> Result<Vec<Study>> {
    if study_ids.is_empty() {
        return db::list_studies(pool).await;
    }

    let mut seen = HashSet::with_capacity(study_ids.len());
    let mut studies = Vec::with_capacity(study_ids.len());
    for &id in study_ids {
        if !seen.insert(id) {
            continue;
        }
        let study = db::load_study(pool, id)
            .await?
            .ok_or_else(|| Error::not_found("study", id))?;
        studies.push(study);
    }
    Ok(studies)
}

/// Flat answer table, per questionnaire in submission order
pub async fn export_answers_csv(pool: &SqlitePool, study_ids: &[i64]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ANSWER_HEADER).map_err(csv_error)?;

    for study in select_studies(pool, study_ids).await? {
        for record in db::list_answer_records(pool, study.id).await? {
            let proband = record.proband_id.to_string();
            let time = record.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string();
            writer
                .write_record([
                    record.study_name.as_str(),
                    record.questionnaire_name.as_str(),
                    proband.as_str(),
                    record.question_text.as_str(),
                    record.kind.wire_tag(),
                    record.value.as_str(),
                    time.as_str(),
                ])
                .map_err(csv_error)?;
        }
    }

    finish(writer)
}

/// Header of an info key column; keys shadowing a fixed column get an `info:` prefix
fn info_column_name(key: &str) -> String {
    if PROBAND_INFO_FIXED_COLUMNS.contains(&key) {
        format!("info:{}", key)
    } else {
        key.to_string()
    }
}

/// Wide proband table over the union of all observed info keys
///
/// When a proband reported the same key twice the later cell wins.
pub async fn export_proband_info_csv(pool: &SqlitePool, study_ids: &[i64]) -> Result<Vec<u8>> {
    let mut keys = BTreeSet::new();
    let mut rows = Vec::new();

    for study in select_studies(pool, study_ids).await? {
        for proband in db::list_probands(pool, study.id).await? {
            let mut cells = BTreeMap::new();
            for cell in db::list_info_cells(pool, proband.id).await? {
                keys.insert(cell.key.clone());
                cells.insert(cell.key, cell.value);
            }
            rows.push((study.name.clone(), proband.id, cells));
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["study".to_string(), "proband".to_string()];
    header.extend(keys.iter().map(|key| info_column_name(key)));
    writer.write_record(&header).map_err(csv_error)?;

    for (study_name, proband_id, cells) in rows {
        let mut record = vec![study_name, proband_id.to_string()];
        record.extend(
            keys.iter()
                .map(|key| cells.get(key).cloned().unwrap_or_default()),
        );
        writer.write_record(&record).map_err(csv_error)?;
    }

    finish(writer)
}

/// Questionnaire schema listing, options joined with `;`
pub async fn export_study_data_csv(pool: &SqlitePool, study_ids: &[i64]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(STUDY_DATA_HEADER).map_err(csv_error)?;

    for study in select_studies(pool, study_ids).await? {
        for questionnaire in db::list_questionnaires(pool, study.id).await? {
            let questions =
                db::list_questions(pool, QuestionOwner::Questionnaire(questionnaire.id)).await?;

            for question in questions {
                let options = if question.kind().has_options() {
                    db::list_choice_options(pool, question.id)
                        .await?
                        .into_iter()
                        .map(|o| o.text)
                        .collect::<Vec<_>>()
                        .join(";")
                } else {
                    String::new()
                };

                let position = question.position.to_string();
                writer
                    .write_record([
                        study.name.as_str(),
                        questionnaire.name.as_str(),
                        position.as_str(),
                        question.kind().wire_tag(),
                        question.text.as_str(),
                        options.as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_columns_never_shadow_fixed_columns() {
        assert_eq!(info_column_name("gender"), "gender");
        assert_eq!(info_column_name("study"), "info:study");
        assert_eq!(info_column_name("proband"), "info:proband");
        assert_eq!(info_column_name("Study"), "Study");
    }
}

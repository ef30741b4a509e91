//! Proband and proband info cell persistence

use chrono::Utc;
use mindrate_common::models::{Proband, ProbandInfoCell};
use mindrate_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

fn proband_from_row(row: &SqliteRow) -> Result<Proband> {
    Ok(Proband {
        id: row.try_get("id")?,
        study_id: row.try_get("study_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Register a new anonymous participant of a study
pub async fn create_proband<'e, E>(executor: E, study_id: i64) -> Result<Proband>
where
    E: Executor<'e, Database = Sqlite>,
{
    let created_at = Utc::now().naive_utc();

    let id = sqlx::query("INSERT INTO probands (study_id, created_at) VALUES (?, ?)")
        .bind(study_id)
        .bind(created_at)
        .execute(executor)
        .await?
        .last_insert_rowid();

    Ok(Proband {
        id,
        study_id,
        created_at,
    })
}

pub async fn load_proband<'e, E>(executor: E, proband_id: i64) -> Result<Option<Proband>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, study_id, created_at FROM probands WHERE id = ?")
        .bind(proband_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(proband_from_row).transpose()
}

pub async fn list_probands<'e, E>(executor: E, study_id: i64) -> Result<Vec<Proband>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT id, study_id, created_at FROM probands WHERE study_id = ? ORDER BY id")
        .bind(study_id)
        .fetch_all(executor)
        .await?;

    rows.iter().map(proband_from_row).collect()
}

/// Store one free-form fact about a proband
pub async fn add_info_cell<'e, E>(
    executor: E,
    proband_id: i64,
    key: &str,
    value: &str,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query(
        "INSERT INTO proband_info_cells (proband_id, info_key, info_value) VALUES (?, ?, ?)",
    )
    .bind(proband_id)
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Info cells of a proband in insertion order
pub async fn list_info_cells<'e, E>(executor: E, proband_id: i64) -> Result<Vec<ProbandInfoCell>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, proband_id, info_key, info_value
        FROM proband_info_cells
        WHERE proband_id = ?
        ORDER BY id
        "#,
    )
    .bind(proband_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ProbandInfoCell {
                id: row.try_get("id")?,
                proband_id: row.try_get("proband_id")?,
                key: row.try_get("info_key")?,
                value: row.try_get("info_value")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::studies::create_study;
    use chrono::NaiveDate;
    use mindrate_common::db::init_memory_database;
    use mindrate_common::models::NewStudy;

    #[tokio::test]
    async fn test_probands_and_info_cells() {
        let pool = init_memory_database().await.unwrap();
        let when = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let study = create_study(
            &pool,
            &NewStudy {
                owner: "owner@example.org".into(),
                name: "Cells".into(),
                start_date_time: when,
                end_date_time: when,
            },
        )
        .await
        .unwrap();

        let first = create_proband(&pool, study.id).await.unwrap();
        let second = create_proband(&pool, study.id).await.unwrap();
        assert_ne!(first.id, second.id);

        add_info_cell(&pool, first.id, "gender", "f").await.unwrap();
        add_info_cell(&pool, first.id, "gender", "d").await.unwrap();

        let cells = list_info_cells(&pool, first.id).await.unwrap();
        let values: Vec<&str> = cells.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["f", "d"]);
        assert!(list_info_cells(&pool, second.id).await.unwrap().is_empty());

        let loaded = load_proband(&pool, second.id).await.unwrap().unwrap();
        assert_eq!(loaded.study_id, study.id);
        assert_eq!(list_probands(&pool, study.id).await.unwrap().len(), 2);
        assert!(load_proband(&pool, 999).await.unwrap().is_none());
    }
}

//! Admin CSV export actions
//!
//! `ids` selects studies as a comma-separated list; without it every study
//! is exported.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::export::reports::{PROBAND_INFO_FILE, STUDY_ANSWER_FILE, STUDY_DATA_FILE};
use crate::export::{export_answers_csv, export_proband_info_csv, export_study_data_csv};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub ids: Option<String>,
}

impl ExportQuery {
    pub fn study_ids(&self) -> ApiResult<Vec<i64>> {
        let Some(ids) = &self.ids else {
            return Ok(Vec::new());
        };

        ids.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid study id: {}", s)))
            })
            .collect()
    }
}

fn attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /admin/export/study_data.csv
pub async fn export_study_data(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let body = export_study_data_csv(&state.db, &query.study_ids()?).await?;
    Ok(attachment(STUDY_DATA_FILE, body))
}

/// GET /admin/export/study_answer.csv
pub async fn export_study_answers(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let body = export_answers_csv(&state.db, &query.study_ids()?).await?;
    Ok(attachment(STUDY_ANSWER_FILE, body))
}

/// GET /admin/export/proband_info.csv
pub async fn export_proband_info(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let body = export_proband_info_csv(&state.db, &query.study_ids()?).await?;
    Ok(attachment(PROBAND_INFO_FILE, body))
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/export/study_data.csv", get(export_study_data))
        .route("/admin/export/study_answer.csv", get(export_study_answers))
        .route("/admin/export/proband_info.csv", get(export_proband_info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_ids_parsing() {
        let query = ExportQuery {
            ids: Some("1, 2,,5".to_string()),
        };
        assert_eq!(query.study_ids().unwrap(), vec![1, 2, 5]);

        assert!(ExportQuery::default().study_ids().unwrap().is_empty());

        let bad = ExportQuery {
            ids: Some("1,x".to_string()),
        };
        assert!(bad.study_ids().is_err());
    }
}

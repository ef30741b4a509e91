//! Study download endpoints used by the mobile client

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::export::{render_questionnaire_preview, render_study_document, PreviewDocument, StudyDocument};
use crate::{db, AppState};

/// Which bare proband-info fields the client should collect
#[derive(Debug, Serialize)]
pub struct ProbandInfoFlags {
    pub birthday: bool,
    pub gender: bool,
    pub occupation: bool,
}

/// GET /download/:study_id/
///
/// Registers a new proband and returns the full study document.
pub async fn download(
    State(state): State<AppState>,
    Path(study_id): Path<i64>,
) -> ApiResult<Json<StudyDocument>> {
    info!("Download requested for study {}", study_id);
    let document = render_study_document(&state.db, study_id).await?;
    Ok(Json(document))
}

/// GET /proband_info/:study_id/
pub async fn proband_info(
    State(state): State<AppState>,
    Path(study_id): Path<i64>,
) -> ApiResult<Json<ProbandInfoFlags>> {
    let info = db::load_proband_info_questionnaire(&state.db, study_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("proband info questionnaire of study {}", study_id))
        })?;

    Ok(Json(ProbandInfoFlags {
        birthday: info.birthday,
        gender: info.gender,
        occupation: info.occupation,
    }))
}

/// GET /preview/:questionnaire_id/
pub async fn preview(
    State(state): State<AppState>,
    Path(questionnaire_id): Path<i64>,
) -> ApiResult<Json<PreviewDocument>> {
    Ok(Json(
        render_questionnaire_preview(&state.db, questionnaire_id).await?,
    ))
}

pub fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/download/:study_id/", get(download))
        .route("/proband_info/:study_id/", get(proband_info))
        .route("/preview/:questionnaire_id/", get(preview))
}

//! Answer upload endpoint

use axum::{body::Bytes, extract::State, routing::post, Router};

use crate::error::ApiResult;
use crate::import::import_answer;
use crate::AppState;

/// POST /receive_answer/
///
/// The body is read raw so malformed JSON surfaces as our own 400 error.
pub async fn receive_answer(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    import_answer(&state.db, &body).await?;
    Ok("OK")
}

pub fn answer_routes() -> Router<AppState> {
    Router::new().route("/receive_answer/", post(receive_answer))
}

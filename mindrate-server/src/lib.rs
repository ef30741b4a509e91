//! mindrate-server library - survey distribution backend
//!
//! Serves study definitions to the mobile client, ingests uploaded answers,
//! and exports collected data as CSV.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod wire;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Mobile client
        .merge(api::download_routes())
        .merge(api::answer_routes())
        // Study director exports
        .merge(api::export_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP API handlers for mindrate-server

pub mod answers;
pub mod download;
pub mod export;
pub mod health;

pub use answers::{answer_routes, receive_answer};
pub use download::{download, download_routes, preview, proband_info};
pub use export::{export_proband_info, export_routes, export_study_answers, export_study_data};
pub use health::health_routes;

//! Exporters: client download document and CSV reports

pub mod document;
pub mod reports;
pub mod sensor_ranges;

pub use document::{
    render_questionnaire_preview, render_study_document, PreviewDocument, StudyDocument,
};
pub use reports::{export_answers_csv, export_proband_info_csv, export_study_data_csv};
pub use sensor_ranges::{sensor_range, SensorRange};

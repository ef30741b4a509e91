//! # MindRate Common Library
//!
//! Shared code for the MindRate survey services:
//! - Database initialization and schema creation
//! - Domain model types (studies, questionnaires, questions, answers)
//! - Bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};

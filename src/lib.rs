//! Lectern library loan server
//!
//! REST JSON API over a catalog of authors, books and members, with a loan
//! ledger that keeps copy counts consistent, confirmation emails queued as
//! background jobs, and a recurring sweep that reminds borrowers of overdue
//! loans.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

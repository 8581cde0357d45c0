//! HTTP request handlers

pub mod health;
pub mod ingest;

use crate::service::IngestService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: IngestService,
}

//! Health check handler

use crate::handlers::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub search_type: &'static str,
}

/// GET /health
///
/// Reports degraded instead of failing when the database is down, so
/// load balancers can still distinguish the two states.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.service.ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(_) => ("degraded", "disconnected"),
    };
    Json(HealthResponse {
        status,
        database,
        search_type: "postgresql_tsvector",
    })
}

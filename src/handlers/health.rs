use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::dto::HealthResponse;
use crate::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Roster.AI API is running",
        service: "roster-api",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend();

    match state.store.ping().await {
        Ok(()) => {
            let stats = state.store.stats().await.ok();
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ready",
                    "backend": backend,
                    "checks": { "store": "ok" },
                    "records": stats,
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, backend = ?backend, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "backend": backend,
                    "checks": { "store": "failed" },
                })),
            )
        }
    }
}

// handlers/public.rs - unauthenticated endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "School API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant school backend with annual class promotion",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "promotion": "/annual-promotion, /promote-class/:id, /promotion-preview, /promotion-readiness (protected)",
                "levels": "/api/academic-levels[/:id], /api/streams (protected)",
                "classes": "/api/classes[/:id[/recount|/lineage]] (protected)",
                "students": "/api/students (protected)",
                "exams": "/api/exams, /api/exam-results[/:id] (protected)",
                "batches": "/api/promotion-batches[/:id] (protected)",
            }
        }
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use server_features::Feature;

use super::state::AppState;

// ── Health ───────────────────────────────────────────────────

pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server_url": state.server_url,
        "server_version": state.features.server_version().map(|v| v.to_string()),
    }))
}

// ── GET /v1/features ─────────────────────────────────────────

pub async fn handle_features(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.features.snapshot().to_json())
}

// ── GET /v1/features/{feature} ───────────────────────────────

pub async fn handle_feature(
    State(state): State<Arc<AppState>>,
    Path(feature_id): Path<String>,
) -> Response {
    match feature_id.parse::<Feature>() {
        Ok(feature) => Json(serde_json::json!({
            "feature": feature.id(),
            "enabled": state.features.is_enabled(feature),
            "min_version": feature.min_version(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

// ── PUT /v1/server-version ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ServerVersionBody {
    pub version: String,
}

pub async fn handle_set_server_version(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ServerVersionBody>,
) -> Json<serde_json::Value> {
    let set = state.features.set_server_version(&body.version);
    Json(set.to_json())
}

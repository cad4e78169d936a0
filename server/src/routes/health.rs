//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    collection: String,
    subscribed: bool,
    task_count: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sync = state.synchronizer();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: sync.collection().to_string(),
        subscribed: sync.is_subscribed().await,
        task_count: state.tasks().tasks().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

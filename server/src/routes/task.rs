//! Task API endpoints
//!
//! JSON access to the synchronized task list. Mutations are forwarded to
//! the document store; the list reflects them once the next snapshot lands.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tasklist_core::task::Task;
use tasklist_core::Error;

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub id: String,
}

/// Toggle request carrying the completion state the client currently shows
#[derive(Debug, Deserialize)]
pub struct ToggleTaskRequest {
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
        Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
        Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - Current task list
async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.tasks().tasks())
}

/// POST /api/tasks - Create a task
async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Response, ApiError> {
    let created = state
        .synchronizer()
        .add_task(&req.title)
        .await
        .map_err(api_error)?;

    Ok(match created {
        Some(id) => (StatusCode::CREATED, Json(CreateTaskResponse { id })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// PATCH /api/tasks/:id - Toggle completion
async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ToggleTaskRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .synchronizer()
        .toggle_task(&id, req.completed)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

/// DELETE /api/tasks/:id - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .synchronizer()
        .delete_task(&id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", patch(toggle_task).delete(delete_task))
}

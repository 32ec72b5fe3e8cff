//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path parameters and JSON bodies via axum
//! extractors, calls into AppState services, and returns JSON responses.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use flashcards_core::types::{
    CreateNoteRequest, CreateTodoRequest, Note, QuizRequest, QuizResult, Todo, UpdateNoteRequest,
    UpdateTodoRequest,
};

use crate::error::ApiError;
use crate::relay::{ensure_flushable, relay_prompt, ChannelSink};
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub total_notes: u64,
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness plus a database round-trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let total_notes = state.notes.count_notes().map_err(|e| {
        warn!(error = %e, "Health check could not reach the database");
        ApiError::ServiceUnavailable("database unavailable".to_string())
    })?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_notes,
    }))
}

// =============================================================================
// Notes
// =============================================================================

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.notes.create_note(&req)?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes - newest first.
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.notes.list_notes()?))
}

/// GET /notes/{id}
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.notes.get_note(id)?))
}

/// PUT /notes/{id}
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.notes.update_note(id, &req)?))
}

/// DELETE /notes/{id}
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete_note(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Todos
// =============================================================================

/// POST /todos
pub async fn create_todo(
    State(state): State<AppState>,
    Json(req): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = state.todos.create_todo(&req)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// GET /todos
pub async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.todos.list_todos()?))
}

/// GET /todos/{id}
pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.todos.get_todo(id)?))
}

/// PUT /todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.todos.update_todo(id, &req)?))
}

/// DELETE /todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.todos.delete_todo(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Quiz
// =============================================================================

/// POST /quiz/generate - one blocking quiz turn.
pub async fn quiz_generate(
    State(state): State<AppState>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<QuizResult>, ApiError> {
    info!(
        notes = req.note_ids.len(),
        messages = req.messages.len(),
        "Received quiz generation request"
    );
    let result = state
        .quiz
        .generate_response(&req.note_ids, &req.messages)
        .await?;
    Ok(Json(result))
}

/// POST /quiz/generate/stream - one streaming quiz turn.
///
/// Prompt preparation happens before the response starts, so a bad request
/// still gets a JSON error with a proper status. Once streaming has begun,
/// failures are reported in-band as a trailing `Error: <message>` fragment.
pub async fn quiz_generate_stream(
    State(state): State<AppState>,
    Json(req): Json<QuizRequest>,
) -> Result<Response, ApiError> {
    info!(
        notes = req.note_ids.len(),
        messages = req.messages.len(),
        "Received streaming quiz generation request"
    );
    let prompt = state.quiz.prepare_prompt(&req.note_ids, &req.messages)?;

    let (mut sink, body) = ChannelSink::new();
    ensure_flushable(&sink)?;

    let quiz = state.quiz.clone();
    tokio::spawn(async move {
        // Generation failures were already written to the body as `Error: ...`.
        if let Err(e) = relay_prompt(&quiz, &prompt, &mut sink).await {
            debug!(error = %e, "Streaming relay ended with an error");
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

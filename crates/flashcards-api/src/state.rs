//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use flashcards_quiz::{ModelClient, NoteSource, QuizOrchestrator};
use flashcards_storage::{Database, NoteService, TodoService};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<NoteService>,
    pub todos: Arc<TodoService>,
    /// Quiz engine, reading notes through `notes`.
    pub quiz: Arc<QuizOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire services over `database` and the given model client.
    pub fn new(database: Database, model: Arc<dyn ModelClient>) -> Self {
        let database = Arc::new(database);
        let notes = Arc::new(NoteService::new(Arc::clone(&database)));
        let todos = Arc::new(TodoService::new(Arc::clone(&database)));
        let source: Arc<dyn NoteSource> = notes.clone();
        let quiz = Arc::new(QuizOrchestrator::new(source, model));

        Self {
            notes,
            todos,
            quiz,
            start_time: Instant::now(),
        }
    }
}

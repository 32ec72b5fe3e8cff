//! Note and todo use-case services.
//!
//! Services validate and normalize requests, then delegate to the
//! repositories. Validation failures surface as
//! [`FlashcardsError::Validation`] with a user-facing message.

use std::sync::Arc;

use tracing::{error, info};

use flashcards_core::error::FlashcardsError;
use flashcards_core::types::{
    CreateNoteRequest, CreateTodoRequest, Note, Todo, UpdateNoteRequest, UpdateTodoRequest,
};

use crate::db::Database;
use crate::repository::{NoteRepository, TodoChanges, TodoRepository};

/// Maximum todo title length, in characters.
pub const MAX_TITLE_LEN: usize = 255;

fn check_id(entity: &str, id: i64) -> Result<(), FlashcardsError> {
    if id <= 0 {
        return Err(FlashcardsError::validation(format!(
            "invalid {} ID: {}",
            entity, id
        )));
    }
    Ok(())
}

/// Note service facade over [`NoteRepository`].
pub struct NoteService {
    repo: NoteRepository,
}

impl NoteService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            repo: NoteRepository::new(db),
        }
    }

    /// Create a note from trimmed, non-empty content.
    pub fn create_note(&self, req: &CreateNoteRequest) -> Result<Note, FlashcardsError> {
        let content = req.content.trim();
        if content.is_empty() {
            error!("Note creation validation failed: content is required");
            return Err(FlashcardsError::validation("content is required"));
        }

        let note = self.repo.create(content).inspect_err(|e| {
            error!(error = %e, "Failed to create note");
        })?;
        info!(note_id = note.id, "Created note");
        Ok(note)
    }

    pub fn get_note(&self, id: i64) -> Result<Note, FlashcardsError> {
        check_id("note", id)?;
        self.repo.get(id)
    }

    /// All notes, newest first.
    pub fn list_notes(&self) -> Result<Vec<Note>, FlashcardsError> {
        let notes = self.repo.list_all().inspect_err(|e| {
            error!(error = %e, "Failed to list notes");
        })?;
        info!(count = notes.len(), "Listed notes");
        Ok(notes)
    }

    /// Apply a partial update. At least one field must be present.
    pub fn update_note(&self, id: i64, req: &UpdateNoteRequest) -> Result<Note, FlashcardsError> {
        check_id("note", id)?;

        let Some(content) = req.content.as_deref() else {
            return Err(FlashcardsError::validation(
                "at least one field must be provided for update",
            ));
        };
        let content = content.trim();
        if content.is_empty() {
            return Err(FlashcardsError::validation("content cannot be empty"));
        }

        let note = self.repo.update_content(id, content).inspect_err(|e| {
            error!(note_id = id, error = %e, "Failed to update note");
        })?;
        info!(note_id = id, "Updated note");
        Ok(note)
    }

    pub fn count_notes(&self) -> Result<u64, FlashcardsError> {
        self.repo.count()
    }

    pub fn delete_note(&self, id: i64) -> Result<(), FlashcardsError> {
        check_id("note", id)?;
        self.repo.delete(id).inspect_err(|e| {
            error!(note_id = id, error = %e, "Failed to delete note");
        })?;
        info!(note_id = id, "Deleted note");
        Ok(())
    }
}

/// Todo service facade over [`TodoRepository`].
pub struct TodoService {
    repo: TodoRepository,
}

impl TodoService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            repo: TodoRepository::new(db),
        }
    }

    pub fn create_todo(&self, req: &CreateTodoRequest) -> Result<Todo, FlashcardsError> {
        let title = validate_title(&req.title, "title is required")?;
        let todo = self.repo.create(title, req.description.trim())?;
        info!(todo_id = todo.id, "Created todo");
        Ok(todo)
    }

    pub fn get_todo(&self, id: i64) -> Result<Todo, FlashcardsError> {
        check_id("todo", id)?;
        self.repo.get(id)
    }

    pub fn list_todos(&self) -> Result<Vec<Todo>, FlashcardsError> {
        self.repo.list_all()
    }

    /// Apply a partial update. At least one field must be present; a present
    /// title must be non-empty after trimming.
    pub fn update_todo(&self, id: i64, req: &UpdateTodoRequest) -> Result<Todo, FlashcardsError> {
        check_id("todo", id)?;

        if req.title.is_none() && req.description.is_none() && req.completed.is_none() {
            return Err(FlashcardsError::validation(
                "at least one field must be provided for update",
            ));
        }

        let title = match req.title.as_deref() {
            Some(t) => Some(validate_title(t, "title cannot be empty")?.to_string()),
            None => None,
        };
        let changes = TodoChanges {
            title,
            description: req.description.as_deref().map(|d| d.trim().to_string()),
            completed: req.completed,
        };

        let todo = self.repo.update(id, &changes)?;
        info!(todo_id = id, completed = todo.completed, "Updated todo");
        Ok(todo)
    }

    pub fn delete_todo(&self, id: i64) -> Result<(), FlashcardsError> {
        check_id("todo", id)?;
        self.repo.delete(id)?;
        info!(todo_id = id, "Deleted todo");
        Ok(())
    }
}

fn validate_title<'a>(raw: &'a str, empty_msg: &str) -> Result<&'a str, FlashcardsError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(FlashcardsError::validation(empty_msg));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(FlashcardsError::validation(format!(
            "title cannot exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title)
}

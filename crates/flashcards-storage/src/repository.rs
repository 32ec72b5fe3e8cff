//! Repository implementations for SQLite-backed persistence.
//!
//! Provides NoteRepository and TodoRepository that operate on the Database
//! struct using raw SQL. Repositories do not validate input; that is the job
//! of the service layer.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;

use flashcards_core::error::FlashcardsError;
use flashcards_core::types::{Note, Todo};

use crate::db::Database;

/// Repository for study notes.
pub struct NoteRepository {
    db: Arc<Database>,
}

impl NoteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a note and return the stored row.
    pub fn create(&self, content: &str) -> Result<Note, FlashcardsError> {
        let now = Utc::now().timestamp_millis();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (content, created_at, updated_at) VALUES (?1, ?2, ?2)",
                rusqlite::params![content, now],
            )
            .map_err(|e| FlashcardsError::Storage(format!("Failed to create note: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Note {
            id,
            content: content.to_string(),
            created_at: from_millis(now),
            updated_at: from_millis(now),
        })
    }

    /// Find a note by ID.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Note>, FlashcardsError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, content, created_at, updated_at FROM notes WHERE id = ?1",
                rusqlite::params![id],
                row_to_note,
            )
            .optional()
            .map_err(|e| FlashcardsError::Storage(e.to_string()))
        })
    }

    /// Fetch a note by ID, failing with `NotFound` when it does not exist.
    pub fn get(&self, id: i64) -> Result<Note, FlashcardsError> {
        self.find_by_id(id)?
            .ok_or(FlashcardsError::NotFound { entity: "note", id })
    }

    /// All notes, newest first.
    pub fn list_all(&self) -> Result<Vec<Note>, FlashcardsError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, content, created_at, updated_at
                     FROM notes
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| FlashcardsError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_note)
                .map_err(|e| FlashcardsError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| FlashcardsError::Storage(e.to_string()))
        })
    }

    /// Replace a note's content. Returns the updated row.
    pub fn update_content(&self, id: i64, content: &str) -> Result<Note, FlashcardsError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE notes SET content = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![content, Utc::now().timestamp_millis(), id],
            )
            .map_err(|e| FlashcardsError::Storage(format!("Failed to update note: {}", e)))
        })?;

        if changed == 0 {
            return Err(FlashcardsError::NotFound { entity: "note", id });
        }
        self.get(id)
    }

    /// Delete a note by ID.
    pub fn delete(&self, id: i64) -> Result<(), FlashcardsError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute("DELETE FROM notes WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| FlashcardsError::Storage(format!("Failed to delete note: {}", e)))
        })?;

        if changed == 0 {
            return Err(FlashcardsError::NotFound { entity: "note", id });
        }
        Ok(())
    }

    /// Count all notes.
    pub fn count(&self) -> Result<u64, FlashcardsError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| FlashcardsError::Storage(e.to_string()))
        })
    }
}

/// Field changes for a todo update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Repository for todo items.
pub struct TodoRepository {
    db: Arc<Database>,
}

impl TodoRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a todo (not completed) and return the stored row.
    pub fn create(&self, title: &str, description: &str) -> Result<Todo, FlashcardsError> {
        let now = Utc::now().timestamp_millis();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (title, description, completed, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?3)",
                rusqlite::params![title, description, now],
            )
            .map_err(|e| FlashcardsError::Storage(format!("Failed to create todo: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Todo {
            id,
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
            created_at: from_millis(now),
            updated_at: from_millis(now),
        })
    }

    /// Find a todo by ID.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Todo>, FlashcardsError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, description, completed, created_at, updated_at
                 FROM todos WHERE id = ?1",
                rusqlite::params![id],
                row_to_todo,
            )
            .optional()
            .map_err(|e| FlashcardsError::Storage(e.to_string()))
        })
    }

    /// Fetch a todo by ID, failing with `NotFound` when it does not exist.
    pub fn get(&self, id: i64) -> Result<Todo, FlashcardsError> {
        self.find_by_id(id)?
            .ok_or(FlashcardsError::NotFound { entity: "todo", id })
    }

    /// All todos, newest first.
    pub fn list_all(&self) -> Result<Vec<Todo>, FlashcardsError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, description, completed, created_at, updated_at
                     FROM todos
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| FlashcardsError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_todo)
                .map_err(|e| FlashcardsError::Storage(e.to_string()))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| FlashcardsError::Storage(e.to_string()))
        })
    }

    /// Apply the given changes and return the updated row.
    pub fn update(&self, id: i64, changes: &TodoChanges) -> Result<Todo, FlashcardsError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE todos SET
                    title = COALESCE(?1, title),
                    description = COALESCE(?2, description),
                    completed = COALESCE(?3, completed),
                    updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![
                    changes.title,
                    changes.description,
                    changes.completed.map(|c| c as i32),
                    Utc::now().timestamp_millis(),
                    id,
                ],
            )
            .map_err(|e| FlashcardsError::Storage(format!("Failed to update todo: {}", e)))
        })?;

        if changed == 0 {
            return Err(FlashcardsError::NotFound { entity: "todo", id });
        }
        self.get(id)
    }

    /// Delete a todo by ID.
    pub fn delete(&self, id: i64) -> Result<(), FlashcardsError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute("DELETE FROM todos WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| FlashcardsError::Storage(format!("Failed to delete todo: {}", e)))
        })?;

        if changed == 0 {
            return Err(FlashcardsError::NotFound { entity: "todo", id });
        }
        Ok(())
    }
}

// =============================================================================
// Row mapping helpers
// =============================================================================

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
}

fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: from_millis(row.get(2)?),
        updated_at: from_millis(row.get(3)?),
    })
}

fn row_to_todo(row: &rusqlite::Row) -> rusqlite::Result<Todo> {
    let completed: i32 = row.get(3)?;
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: completed != 0,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}

//! Flashcards storage crate - SQLite persistence for notes and todos.
//!
//! Provides a WAL-mode SQLite database with migrations, repository
//! implementations for notes and todos, and the validating services the
//! HTTP layer calls into.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod service;

pub use db::Database;
pub use repository::{NoteRepository, TodoChanges, TodoRepository};
pub use service::{NoteService, TodoService, MAX_TITLE_LEN};

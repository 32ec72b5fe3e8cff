//! SQLite handle shared by the note and todo repositories.
//!
//! One connection serves the whole process; repositories borrow it through
//! [`Database::with_conn`]. Opening a database always brings the notes and
//! todos schema up to date.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use flashcards_core::error::FlashcardsError;

use crate::migrations;

/// PRAGMAs for file-backed stores. WAL lets health checks read while a
/// write is in flight.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;";

const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

fn storage_err(context: &str) -> impl FnOnce(rusqlite::Error) -> FlashcardsError + '_ {
    move |e| FlashcardsError::Storage(format!("{context}: {e}"))
}

/// The flashcards store: a single connection behind a mutex.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the store at `path`, creating the file and its directory on
    /// first run.
    pub fn new(path: &Path) -> Result<Self, FlashcardsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(storage_err("Failed to open database"))?;
        let db = Self::prepare(conn, FILE_PRAGMAS)?;
        info!(path = %path.display(), "Flashcards store ready");
        Ok(db)
    }

    /// Throwaway store used by tests and the API test harness.
    pub fn in_memory() -> Result<Self, FlashcardsError> {
        let conn = Connection::open_in_memory()
            .map_err(storage_err("Failed to open in-memory database"))?;
        Self::prepare(conn, MEMORY_PRAGMAS)
    }

    fn prepare(conn: Connection, pragmas: &str) -> Result<Self, FlashcardsError> {
        conn.execute_batch(pragmas)
            .map_err(storage_err("Failed to set pragmas"))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        debug!("Notes and todos schema is current");
        Ok(db)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, FlashcardsError>
    where
        F: FnOnce(&Connection) -> Result<T, FlashcardsError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FlashcardsError::Storage(format!("Database lock poisoned: {e}")))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

//! Note lookup capability used by the quiz engine.

use flashcards_core::error::FlashcardsError;
use flashcards_core::types::Note;
use flashcards_storage::NoteService;

/// Read-only access to the full note collection.
pub trait NoteSource: Send + Sync {
    fn all_notes(&self) -> Result<Vec<Note>, FlashcardsError>;
}

impl NoteSource for NoteService {
    fn all_notes(&self) -> Result<Vec<Note>, FlashcardsError> {
        self.list_notes()
    }
}

//! Shared domain types, configuration, and errors for the Flashcards backend.

pub mod config;
pub mod error;
pub mod types;

pub use config::FlashcardsConfig;
pub use error::{FlashcardsError, Result};
pub use types::*;

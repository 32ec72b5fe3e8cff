//! Quiz engine for Flashcards.
//!
//! Turns selected notes and a running transcript into a prompt, asks a
//! language model for the next quiz turn, and returns the reply whole or as
//! a stream of chunks.

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod source;

pub use client::{ModelClient, OpenAiClient};
pub use error::{ModelError, QuizError};
pub use orchestrator::{QuizOrchestrator, QuizStream, QUIZ_TEMPERATURE};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use source::NoteSource;

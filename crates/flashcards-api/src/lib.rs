//! Flashcards API crate - axum HTTP server, route handlers, quiz streaming.
//!
//! Provides the REST API for notes, todos and quiz turns, plus a health
//! check.

pub mod error;
pub mod handlers;
pub mod relay;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;

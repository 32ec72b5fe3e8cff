use thiserror::Error;

/// Top-level error type for the Flashcards backend.
///
/// Subsystem crates define their own error types and convert into or out of
/// `FlashcardsError` at crate boundaries so that `?` works across them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Validation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FlashcardsError {
    /// Shorthand for a validation failure with a human-readable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        FlashcardsError::Validation(msg.into())
    }
}

impl From<toml::de::Error> for FlashcardsError {
    fn from(err: toml::de::Error) -> Self {
        FlashcardsError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FlashcardsError {
    fn from(err: toml::ser::Error) -> Self {
        FlashcardsError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FlashcardsError {
    fn from(err: serde_json::Error) -> Self {
        FlashcardsError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Flashcards operations.
pub type Result<T> = std::result::Result<T, FlashcardsError>;

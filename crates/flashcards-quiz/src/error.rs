//! Error types for quiz generation.

/// Errors from the language-model client.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode model response: {0}")]
    Decode(String),
    /// The provider answered with an `error` object instead of a completion.
    #[error("model provider reported an error: {0}")]
    Provider(String),
    #[error("model returned an empty completion")]
    EmptyCompletion,
    #[error("no API key configured for the model provider")]
    MissingApiKey,
}

/// Errors from the quiz engine. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// No requested id matched a stored note.
    #[error("at least one valid note id is required")]
    NoValidNotes,
    #[error("failed to retrieve notes: {0}")]
    StoreReadFailed(String),
    #[error("failed to generate LLM response: {0}")]
    GenerationFailed(#[source] ModelError),
    /// Streaming was requested on a transport that cannot flush.
    #[error("streaming not supported")]
    TransportUnsupported,
}

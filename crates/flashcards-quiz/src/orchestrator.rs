//! Quiz orchestrator: builds the prompt, calls the model, and returns or
//! streams the assistant reply.
//!
//! Each call is independent. The orchestrator keeps no conversation state;
//! callers send the full transcript with every turn.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

use flashcards_core::types::{Message, QuizResult};

use crate::client::ModelClient;
use crate::error::QuizError;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::source::NoteSource;

/// Sampling temperature for every quiz turn.
pub const QUIZ_TEMPERATURE: f32 = 0.7;

/// Finite stream of reply chunks in arrival order. A generation failure is
/// yielded as a final `Err` item.
pub type QuizStream = UnboundedReceiverStream<Result<String, QuizError>>;

/// Central quiz coordinator.
pub struct QuizOrchestrator {
    notes: Arc<dyn NoteSource>,
    client: Arc<dyn ModelClient>,
}

impl QuizOrchestrator {
    pub fn new(notes: Arc<dyn NoteSource>, client: Arc<dyn ModelClient>) -> Self {
        Self { notes, client }
    }

    /// Load notes and build the prompt for this turn.
    ///
    /// Fails with [`QuizError::StoreReadFailed`] if notes cannot be read and
    /// [`QuizError::NoValidNotes`] if none of `note_ids` exist.
    pub fn prepare_prompt(
        &self,
        note_ids: &[i64],
        messages: &[Message],
    ) -> Result<String, QuizError> {
        info!(
            requested = note_ids.len(),
            history = messages.len(),
            "Preparing quiz prompt"
        );

        let notes = self.notes.all_notes().map_err(|e| {
            error!(error = %e, "Failed to retrieve notes");
            QuizError::StoreReadFailed(e.to_string())
        })?;

        build_prompt(&notes, note_ids, messages)
    }

    /// Run one blocking quiz turn.
    ///
    /// Returns the requested ids and the prior messages with one trimmed
    /// assistant reply appended.
    pub async fn generate_response(
        &self,
        note_ids: &[i64],
        messages: &[Message],
    ) -> Result<QuizResult, QuizError> {
        let prompt = self.prepare_prompt(note_ids, messages)?;
        self.complete_prompt(note_ids, messages, &prompt).await
    }

    /// Call the model with an already prepared prompt.
    pub async fn complete_prompt(
        &self,
        note_ids: &[i64],
        messages: &[Message],
        prompt: &str,
    ) -> Result<QuizResult, QuizError> {
        let completion = self
            .client
            .complete(SYSTEM_PROMPT, prompt, QUIZ_TEMPERATURE)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to generate quiz response");
                QuizError::GenerationFailed(e)
            })?;

        let mut updated = messages.to_vec();
        updated.push(Message::assistant(completion.trim()));

        info!(total = updated.len(), "Generated quiz response");
        Ok(QuizResult {
            note_ids: note_ids.to_vec(),
            messages: updated,
        })
    }

    /// Run one streaming quiz turn, handing each chunk to `on_chunk`.
    ///
    /// Chunks are forwarded synchronously and in order. Nothing is
    /// accumulated; chunks delivered before a failure stay delivered.
    pub async fn generate_response_stream<F>(
        &self,
        note_ids: &[i64],
        messages: &[Message],
        on_chunk: F,
    ) -> Result<(), QuizError>
    where
        F: FnMut(&str) + Send,
    {
        let prompt = self.prepare_prompt(note_ids, messages)?;
        self.stream_prompt(&prompt, on_chunk).await
    }

    /// Stream a reply for an already prepared prompt.
    pub async fn stream_prompt<F>(&self, prompt: &str, mut on_chunk: F) -> Result<(), QuizError>
    where
        F: FnMut(&str) + Send,
    {
        self.client
            .complete_streaming(SYSTEM_PROMPT, prompt, QUIZ_TEMPERATURE, &mut on_chunk)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to stream quiz response");
                QuizError::GenerationFailed(e)
            })?;

        info!("Completed streaming quiz response");
        Ok(())
    }

    /// Run one streaming quiz turn as a lazy sequence of chunks.
    ///
    /// Preparation errors are returned directly. The model call runs on a
    /// spawned task, so this must be called from within a Tokio runtime.
    pub fn stream_response(
        &self,
        note_ids: &[i64],
        messages: &[Message],
    ) -> Result<QuizStream, QuizError> {
        let prompt = self.prepare_prompt(note_ids, messages)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            let mut forward = |chunk: &str| {
                // The receiver may be gone; the model call still completes.
                let _ = tx.send(Ok(chunk.to_string()));
            };
            let result = client
                .complete_streaming(SYSTEM_PROMPT, &prompt, QUIZ_TEMPERATURE, &mut forward)
                .await;

            if let Err(e) = result {
                error!(error = %e, "Quiz stream failed");
                let _ = tx.send(Err(QuizError::GenerationFailed(e)));
            }
        });

        Ok(UnboundedReceiverStream::new(rx))
    }
}

//! Streaming relay from the quiz engine to an HTTP response body.
//!
//! A [`TokenSink`] is anything that can take text fragments and push them
//! to the client incrementally. The relay refuses to start on a sink that
//! cannot flush, since the client would otherwise see nothing until the end.

use std::convert::Infallible;

use axum::body::Body;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use flashcards_core::types::Message;
use flashcards_quiz::{QuizError, QuizOrchestrator};

/// Destination for streamed reply fragments.
pub trait TokenSink: Send {
    /// Whether `flush` actually delivers data before the response ends.
    fn supports_flush(&self) -> bool;
    /// Queue a fragment. Delivery failures (client gone) are ignored.
    fn write_chunk(&mut self, chunk: &str);
    /// Push queued fragments to the client.
    fn flush(&mut self);
}

/// Sink backed by a channel feeding a streaming [`Body`]. Each flush becomes
/// one body frame.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Result<String, Infallible>>,
    pending: String,
}

impl ChannelSink {
    /// Create a sink and the response body it feeds.
    pub fn new() -> (Self, Body) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            pending: String::new(),
        };
        (sink, Body::from_stream(UnboundedReceiverStream::new(rx)))
    }
}

impl TokenSink for ChannelSink {
    fn supports_flush(&self) -> bool {
        true
    }

    fn write_chunk(&mut self, chunk: &str) {
        self.pending.push_str(chunk);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let frame = std::mem::take(&mut self.pending);
        let _ = self.tx.send(Ok(frame));
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        self.flush();
    }
}

fn forward<S: TokenSink>(sink: &mut S, chunk: &str) {
    sink.write_chunk(chunk);
    sink.flush();
}

fn finish<S: TokenSink>(sink: &mut S, result: Result<(), QuizError>) -> Result<(), QuizError> {
    match &result {
        Ok(()) => info!("Streaming quiz generation completed"),
        Err(e) => {
            warn!(error = %e, "Streaming quiz generation failed");
            forward(sink, &format!("Error: {}", e));
        }
    }
    result
}

/// Fail with [`QuizError::TransportUnsupported`] unless `sink` can flush.
pub fn ensure_flushable<S: TokenSink>(sink: &S) -> Result<(), QuizError> {
    if sink.supports_flush() {
        Ok(())
    } else {
        warn!("Streaming not supported by transport");
        Err(QuizError::TransportUnsupported)
    }
}

/// Run a full streaming quiz turn into `sink`.
///
/// Fails with [`QuizError::TransportUnsupported`] before touching the quiz
/// engine when the sink cannot flush. On any later failure an
/// `Error: <message>` fragment is written after whatever was already sent.
pub async fn relay_stream<S: TokenSink>(
    quiz: &QuizOrchestrator,
    note_ids: &[i64],
    messages: &[Message],
    sink: &mut S,
) -> Result<(), QuizError> {
    ensure_flushable(sink)?;

    let result = quiz
        .generate_response_stream(note_ids, messages, |chunk| forward(sink, chunk))
        .await;
    finish(sink, result)
}

/// Like [`relay_stream`], for a prompt the caller already prepared.
pub async fn relay_prompt<S: TokenSink>(
    quiz: &QuizOrchestrator,
    prompt: &str,
    sink: &mut S,
) -> Result<(), QuizError> {
    ensure_flushable(sink)?;

    let result = quiz
        .stream_prompt(prompt, |chunk| forward(sink, chunk))
        .await;
    finish(sink, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use flashcards_core::error::FlashcardsError;
    use flashcards_core::types::Note;
    use flashcards_quiz::{ModelClient, ModelError, NoteSource};

    struct OneNote;

    impl NoteSource for OneNote {
        fn all_notes(&self) -> Result<Vec<Note>, FlashcardsError> {
            let now = Utc::now();
            Ok(vec![Note {
                id: 1,
                content: "Water boils at 100C at sea level".to_string(),
                created_at: now,
                updated_at: now,
            }])
        }
    }

    struct Chunks {
        chunks: Vec<&'static str>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for Chunks {
        async fn complete(&self, _: &str, _: &str, _: f32) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.chunks.concat())
        }

        async fn complete_streaming(
            &self,
            _: &str,
            _: &str,
            _: f32,
            on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<(), ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for c in &self.chunks {
                on_chunk(c);
            }
            if self.fail {
                return Err(ModelError::Decode("truncated stream".to_string()));
            }
            Ok(())
        }
    }

    /// Records every write and flush.
    #[derive(Default)]
    struct RecordingSink {
        can_flush: bool,
        written: Vec<String>,
        flushes: usize,
    }

    impl TokenSink for RecordingSink {
        fn supports_flush(&self) -> bool {
            self.can_flush
        }
        fn write_chunk(&mut self, chunk: &str) {
            self.written.push(chunk.to_string());
        }
        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    fn quiz(chunks: Vec<&'static str>, fail: bool) -> (QuizOrchestrator, Arc<Chunks>) {
        let model = Arc::new(Chunks {
            chunks,
            fail,
            calls: AtomicUsize::new(0),
        });
        (QuizOrchestrator::new(Arc::new(OneNote), model.clone()), model)
    }

    #[tokio::test]
    async fn test_relay_writes_and_flushes_each_chunk() {
        let (quiz, _) = quiz(vec!["Wh", "y is ", "blue?"], false);
        let mut sink = RecordingSink {
            can_flush: true,
            ..Default::default()
        };

        relay_stream(&quiz, &[1], &[], &mut sink).await.unwrap();
        assert_eq!(sink.written, vec!["Wh", "y is ", "blue?"]);
        assert_eq!(sink.flushes, 3);
    }

    #[tokio::test]
    async fn test_relay_rejects_non_flushing_sink() {
        let (quiz, model) = quiz(vec!["unused"], false);
        let mut sink = RecordingSink::default();

        let err = relay_stream(&quiz, &[1], &[], &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::TransportUnsupported));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_ensure_flushable() {
        let sink = RecordingSink::default();
        assert!(matches!(
            ensure_flushable(&sink),
            Err(QuizError::TransportUnsupported)
        ));

        let (channel, _body) = ChannelSink::new();
        assert!(ensure_flushable(&channel).is_ok());
    }

    #[tokio::test]
    async fn test_relay_prompt_rejects_non_flushing_sink() {
        let (quiz, model) = quiz(vec!["unused"], false);
        let mut sink = RecordingSink::default();

        let err = relay_prompt(&quiz, "prompt", &mut sink).await.unwrap_err();
        assert!(matches!(err, QuizError::TransportUnsupported));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_relay_appends_error_fragment() {
        let (quiz, _) = quiz(vec!["Wh", "y "], true);
        let mut sink = RecordingSink {
            can_flush: true,
            ..Default::default()
        };

        let err = relay_prompt(&quiz, "prompt", &mut sink).await.unwrap_err();
        assert!(matches!(err, QuizError::GenerationFailed(_)));
        assert_eq!(sink.written.len(), 3);
        assert_eq!(&sink.written[..2], &["Wh", "y "]);
        assert!(sink.written[2].starts_with("Error: "));
        assert!(sink.written[2].contains("truncated stream"));
    }

    #[tokio::test]
    async fn test_channel_sink_frames_body() {
        let (mut sink, body) = ChannelSink::new();
        sink.write_chunk("a");
        sink.write_chunk("b");
        sink.flush();
        sink.flush();
        sink.write_chunk("c");
        drop(sink);

        let bytes = axum::body::to_bytes(body, 1024).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }
}

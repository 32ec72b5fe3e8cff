//! Language-model client capability and an OpenAI-compatible implementation.
//!
//! The quiz engine only needs two operations: a blocking completion and a
//! streaming completion that hands each text delta to a callback as it
//! arrives. [`OpenAiClient`] implements both against `/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use flashcards_core::config::LlmConfig;

use crate::error::ModelError;

/// Text-generation capability used by the quiz orchestrator.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produce a full completion for `prompt` under the `system` instruction.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, ModelError>;

    /// Produce a completion incrementally. `on_chunk` is called once per
    /// delta, in arrival order, before this future resolves.
    async fn complete_streaming(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), ModelError>;
}

/// Client for an OpenAI-compatible chat completions API.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    /// Build a client from the `[llm]` configuration section.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`ModelError::MissingApiKey`] instead so the rest of the service can
    /// still run.
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            warn!("No model API key configured; quiz generation will fail");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        stream: bool,
    ) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": temperature,
            "stream": stream,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
        })
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, ModelError> {
        debug!(model = %self.model, "Sending chat completion request");
        let body = self.request_body(system, prompt, temperature, false);
        let resp = self.send(&body).await?;

        let text = resp.text().await?;
        parse_completion(&text)
    }

    async fn complete_streaming(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), ModelError> {
        debug!(model = %self.model, "Sending streaming chat completion request");
        let body = self.request_body(system, prompt, temperature, true);
        let mut resp = self.send(&body).await?;

        let mut decoder = SseDecoder::default();
        let mut done = false;
        let mut deltas = 0usize;

        'read: while let Some(bytes) = resp.chunk().await? {
            decoder.push(&bytes);
            // Deltas decoded before a failing line have already been handed on.
            while let Some(event) = decoder.next_event()? {
                match event {
                    SseEvent::Delta(text) => {
                        deltas += 1;
                        on_chunk(&text);
                    }
                    SseEvent::Done => {
                        done = true;
                        break 'read;
                    }
                }
            }
        }

        if !done {
            match decoder.finish()? {
                Some(SseEvent::Delta(text)) => {
                    deltas += 1;
                    on_chunk(&text);
                }
                Some(SseEvent::Done) => done = true,
                None => {}
            }
        }

        if !done {
            warn!(deltas, "Stream closed without a [DONE] marker");
            return Err(ModelError::Decode("stream ended before [DONE]".to_string()));
        }

        debug!(deltas, "Stream completed");
        Ok(())
    }
}

// =============================================================================
// Response decoding
// =============================================================================

#[derive(Deserialize, Debug)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    error: Option<ProviderError>,
}

/// `error` object some providers send with a 200 status or inside a stream.
#[derive(Deserialize, Debug)]
struct ProviderError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl From<ProviderError> for ModelError {
    fn from(err: ProviderError) -> Self {
        let message = err
            .message
            .or(err.kind)
            .unwrap_or_else(|| "unknown error".to_string());
        ModelError::Provider(message)
    }
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize, Debug)]
struct CompletionMessage {
    content: Option<String>,
}

/// Extract the first choice's message content from a completion body.
fn parse_completion(body: &str) -> Result<String, ModelError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;

    if let Some(err) = completion.error {
        return Err(err.into());
    }

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or(ModelError::EmptyCompletion)
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ProviderError>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    content: Option<String>,
}

/// One meaningful event from a chat completions SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    Delta(String),
    Done,
}

/// Incremental line decoder for `text/event-stream` bodies.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across network chunks are decoded intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Decode buffered lines until one yields an event. `None` means more
    /// bytes are needed.
    pub(crate) fn next_event(&mut self) -> Result<Option<SseEvent>, ModelError> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_sse_line(&String::from_utf8_lossy(&line))? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Decode a trailing line that had no newline terminator.
    pub(crate) fn finish(&mut self) -> Result<Option<SseEvent>, ModelError> {
        let rest = std::mem::take(&mut self.buffer);
        parse_sse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_sse_line(line: &str) -> Result<Option<SseEvent>, ModelError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let Some(data) = line.strip_prefix("data:") else {
        // `event:`, `id:` and `retry:` fields carry nothing we use.
        return Ok(None);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| ModelError::Decode(e.to_string()))?;

    if let Some(err) = chunk.error {
        return Err(err.into());
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|c| !c.is_empty());

    Ok(content.map(SseEvent::Delta))
}

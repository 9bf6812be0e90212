//! SSE stream parsing for OpenAI-compatible streaming responses.
//!
//! The stream is a finite lazy sequence of text fragments; the caller
//! cancels by dropping it, which aborts the underlying request.

use futures::{Stream, StreamExt};
use std::pin::Pin;

use cnote_core::{CompletionMessage, Error, Result};

use super::types::ChatCompletionChunk;

/// Stream of completion text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming completion trait extension.
#[async_trait::async_trait]
pub trait StreamingCompletion: Send + Sync {
    /// Request a completion and stream its text fragments.
    async fn complete_stream(
        &self,
        system: &str,
        messages: &[CompletionMessage],
    ) -> Result<TokenStream>;
}

/// Parse an SSE byte stream from an OpenAI-compatible endpoint.
pub fn parse_sse_stream(
    stream: impl Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> TokenStream {
    let token_stream = stream
        .map(|chunk_result| {
            chunk_result.map_err(|e| Error::Inference(format!("Stream error: {}", e)))
        })
        .filter_map(|result| async move {
            match result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    parse_sse_chunk(&text)
                }
                Err(e) => Some(Err(e)),
            }
        });

    Box::pin(token_stream)
}

/// Parse a single SSE chunk and extract content.
fn parse_sse_chunk(chunk: &str) -> Option<Result<String>> {
    let mut content = String::new();

    for line in chunk.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        // End of stream marker
        if line == "data: [DONE]" {
            return None;
        }

        if let Some(data) = line.strip_prefix("data: ") {
            match serde_json::from_str::<ChatCompletionChunk>(data) {
                Ok(chunk) => {
                    for choice in chunk.choices {
                        if let Some(c) = choice.delta.content {
                            content.push_str(&c);
                        }
                    }
                }
                Err(e) => {
                    return Some(Err(Error::Inference(format!(
                        "Failed to parse SSE chunk: {}",
                        e
                    ))));
                }
            }
        }
    }

    if content.is_empty() {
        None
    } else {
        Some(Ok(content))
    }
}

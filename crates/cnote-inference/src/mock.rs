//! Mock inference backend for deterministic testing.
//!
//! Embeddings are hash-seeded so the same text always yields the same
//! vector; completion turns are scripted in advance so orchestrator tests
//! can drive multi-iteration tool-calling conversations without a live
//! model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cnote_core::{
    CompletionBackend, CompletionMessage, CompletionResponse, EmbeddingBackend, Error, Result,
    ToolCallRequest, ToolDefinition, Vector,
};

/// Default dimension for mock embeddings.
pub const MOCK_DIMENSION: usize = 8;

/// A logged backend call, for assertions.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

/// Deterministic mock backend implementing both inference traits.
#[derive(Clone)]
pub struct MockInferenceBackend {
    dimension: usize,
    default_response: String,
    fail_embeddings: bool,
    turns: Arc<Mutex<VecDeque<CompletionResponse>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferenceBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            dimension: MOCK_DIMENSION,
            default_response: "Mock response".to_string(),
            fail_embeddings: false,
            turns: Arc::new(Mutex::new(VecDeque::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set the response returned once scripted turns run out.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Make all embedding calls fail.
    pub fn with_failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    /// Script a completion turn that requests tool calls.
    pub fn with_tool_call_turn(self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.turns.lock().unwrap().push_back(CompletionResponse {
            content: String::new(),
            tool_calls,
        });
        self
    }

    /// Script a final-answer completion turn.
    pub fn with_answer_turn(self, content: impl Into<String>) -> Self {
        self.turns.lock().unwrap().push_back(CompletionResponse {
            content: content.into(),
            tool_calls: vec![],
        });
        self
    }

    /// All logged calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of completion calls made.
    pub fn completion_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "complete")
            .count()
    }

    /// Number of embedding calls made.
    pub fn embed_call_count(&self) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "embed_texts")
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
        });
    }

    /// Deterministic embedding: FNV-hash the text, then expand with a
    /// small LCG. Same text, same vector, always.
    fn embedding_for(&self, text: &str) -> Vector {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }

        let mut state = hash.max(1);
        let values: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (u32::MAX as f32)) * 2.0 - 1.0
            })
            .collect();

        Vector::from(values)
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.log_call("embed_texts", &format!("{} texts", texts.len()));

        if self.fail_embeddings {
            return Err(Error::Embedding("mock embedding failure".into()));
        }

        Ok(texts.iter().map(|t| self.embedding_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl CompletionBackend for MockInferenceBackend {
    async fn complete(
        &self,
        _system: &str,
        messages: &[CompletionMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CompletionResponse> {
        let last = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.log_call("complete", &last);

        if let Some(turn) = self.turns.lock().unwrap().pop_front() {
            return Ok(turn);
        }

        Ok(CompletionResponse {
            content: self.default_response.clone(),
            tool_calls: vec![],
        })
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnote_core::ChatRole;
    use serde_json::json;

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let backend = MockInferenceBackend::new();
        let texts = vec!["hello".to_string()];
        let a = backend.embed_texts(&texts).await.unwrap();
        let b = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(a[0].as_slice(), b[0].as_slice());
    }

    #[tokio::test]
    async fn test_distinct_texts_distinct_vectors() {
        let backend = MockInferenceBackend::new();
        let texts = vec!["hello".to_string(), "world".to_string()];
        let vectors = backend.embed_texts(&texts).await.unwrap();
        assert_ne!(vectors[0].as_slice(), vectors[1].as_slice());
    }

    #[tokio::test]
    async fn test_dimension_respected() {
        let backend = MockInferenceBackend::new().with_dimension(32);
        let vectors = backend
            .embed_texts(&["x".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0].as_slice().len(), 32);
    }

    #[tokio::test]
    async fn test_scripted_turns_play_in_order() {
        let backend = MockInferenceBackend::new()
            .with_tool_call_turn(vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "private_search_notes".to_string(),
                arguments: json!({"query": "trip"}),
            }])
            .with_answer_turn("done");

        let msgs = [CompletionMessage::text(ChatRole::User, "hi")];
        let first = backend.complete("", &msgs, &[]).await.unwrap();
        assert_eq!(first.tool_calls.len(), 1);

        let second = backend.complete("", &msgs, &[]).await.unwrap();
        assert!(second.tool_calls.is_empty());
        assert_eq!(second.content, "done");

        // Turns exhausted: default response.
        let third = backend.complete("", &msgs, &[]).await.unwrap();
        assert_eq!(third.content, "Mock response");
        assert_eq!(backend.completion_call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_embeddings() {
        let backend = MockInferenceBackend::new().with_failing_embeddings();
        let err = backend.embed_texts(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}

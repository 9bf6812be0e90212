//! Inference backends for embeddings and chat completion.
//!
//! The production backend speaks the OpenAI-compatible wire protocol and
//! works against OpenAI, DeepSeek, Doubao, and local servers such as
//! Ollama or vLLM. A deterministic mock backend is provided for tests.

pub mod mock;
pub mod openai;

pub use mock::MockInferenceBackend;
pub use openai::{
    parse_sse_stream, OpenAIBackend, OpenAIConfig, StreamingCompletion, TokenStream,
    DEFAULT_BASE_URL,
};

//! OpenAI-compatible inference backend.
//!
//! This module provides embedding and chat-completion clients that work
//! with any OpenAI-compatible API endpoint, including:
//!
//! - OpenAI cloud API
//! - DeepSeek
//! - Doubao (Volcano Engine)
//! - Ollama (in OpenAI compatibility mode)
//! - vLLM

mod backend;
mod streaming;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig, DEFAULT_BASE_URL};
pub use streaming::{parse_sse_stream, StreamingCompletion, TokenStream};
pub use types::*;

//! OpenAI-compatible inference backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use cnote_core::{
    defaults, ChatRole, CompletionBackend, CompletionMessage, CompletionResponse, EmbeddingBackend,
    Error, Result, ToolCallRequest, ToolDefinition, Vector,
};

use super::streaming::{parse_sse_stream, StreamingCompletion, TokenStream};
use super::types::*;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for embeddings.
    pub embed_model: String,
    /// Model to use for chat completions.
    pub gen_model: String,
    /// Expected embedding dimension.
    pub embed_dimension: usize,
    /// Texts per embedding request.
    pub embed_batch_size: usize,
    /// Embedding request timeout in seconds.
    pub embed_timeout_secs: u64,
    /// Completion request timeout in seconds.
    pub gen_timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            embed_model: defaults::EMBED_MODEL.to_string(),
            gen_model: defaults::GEN_MODEL.to_string(),
            embed_dimension: defaults::EMBED_DIMENSION,
            embed_batch_size: defaults::EMBED_BATCH_SIZE,
            embed_timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            gen_timeout_secs: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible inference backend.
///
/// Works against any endpoint speaking the OpenAI wire format (OpenAI,
/// DeepSeek, Doubao/Volcano, Ollama in compatibility mode, vLLM).
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gen_timeout_secs))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing inference backend: url={}, embed={}, gen={}",
            config.base_url, config.embed_model, config.gen_model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LLM_BASE_URL` | `https://api.openai.com/v1` |
    /// | `LLM_API_KEY` | none |
    /// | `LLM_EMBED_MODEL` | `text-embedding-3-small` |
    /// | `LLM_GEN_MODEL` | `deepseek-chat` |
    /// | `LLM_EMBED_DIM` | `1536` |
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            embed_model: std::env::var("LLM_EMBED_MODEL")
                .unwrap_or_else(|_| defaults::EMBED_MODEL.to_string()),
            gen_model: std::env::var("LLM_GEN_MODEL")
                .unwrap_or_else(|_| defaults::GEN_MODEL.to_string()),
            embed_dimension: std::env::var("LLM_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::EMBED_DIMENSION),
            embed_batch_size: defaults::EMBED_BATCH_SIZE,
            embed_timeout_secs: std::env::var("LLM_EMBED_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::EMBED_TIMEOUT_SECS),
            gen_timeout_secs: std::env::var("LLM_GEN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GEN_TIMEOUT_SECS),
        };

        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a POST request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }

    /// Embed one batch and return its vectors in input order.
    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vector>> {
        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            input: batch.to_vec(),
            encoding_format: Some("float".to_string()),
        };

        let response = self
            .build_request("/embeddings")
            .timeout(Duration::from_secs(self.config.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ApiErrorResponse = response
                .json()
                .await
                .unwrap_or_else(|_| ApiErrorResponse::unknown());
            return Err(Error::Embedding(format!(
                "Upstream returned {}: {}",
                status, body.error.message
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.data.is_empty() {
            return Err(Error::Embedding("empty embedding response".into()));
        }
        if result.data.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                result.data.len()
            )));
        }

        // The upstream may return batch entries out of order; re-sort by
        // the provided input index before concatenating. Skipping this
        // would silently attach vectors to the wrong chunks.
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| Vector::from(d.embedding)).collect())
    }

    fn build_wire_messages(system: &str, messages: &[CompletionMessage]) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(messages.len() + 1);

        if !system.is_empty() {
            wire.push(WireMessage::text("system", system));
        }

        for msg in messages {
            if msg.role == ChatRole::Assistant && !msg.tool_calls.is_empty() {
                wire.push(WireMessage {
                    role: "assistant".to_string(),
                    content: if msg.content.is_empty() {
                        None
                    } else {
                        Some(msg.content.clone())
                    },
                    tool_calls: Some(
                        msg.tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: call.id.clone(),
                                call_type: "function".to_string(),
                                function: WireFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    ),
                    tool_call_id: None,
                });
            } else if msg.role == ChatRole::Tool {
                wire.push(WireMessage {
                    role: "tool".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: msg.tool_call_id.clone(),
                });
            } else {
                wire.push(WireMessage::text(msg.role.as_str(), msg.content.clone()));
            }
        }

        wire
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAIBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(
            input_count = texts.len(),
            model = %self.config.embed_model,
            "Embedding texts"
        );

        // Any failed batch fails the whole call; partial success would
        // leave the caller holding misaligned vectors.
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embed_batch_size) {
            let batch_vectors = self.embed_batch(batch).await?;
            vectors.extend(batch_vectors);
        }

        debug!(result_count = vectors.len(), "Generated embeddings");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.embed_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl CompletionBackend for OpenAIBackend {
    async fn complete(
        &self,
        system: &str,
        messages: &[CompletionMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionResponse> {
        debug!(
            model = %self.config.gen_model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "Requesting completion"
        );

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages: Self::build_wire_messages(system, messages),
            temperature: Some(defaults::GEN_TEMPERATURE),
            max_tokens: Some(defaults::GEN_MAX_TOKENS),
            stream: false,
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    tool_type: "function".to_string(),
                    function: WireFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ApiErrorResponse = response
                .json()
                .await
                .unwrap_or_else(|_| ApiErrorResponse::unknown());
            return Err(Error::Inference(format!(
                "Upstream returned {}: {}",
                status, body.error.message
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("completion response had no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                // Malformed argument JSON becomes Null and fails the
                // individual tool call downstream, not the whole turn.
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

#[async_trait]
impl StreamingCompletion for OpenAIBackend {
    async fn complete_stream(
        &self,
        system: &str,
        messages: &[CompletionMessage],
    ) -> Result<TokenStream> {
        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages: Self::build_wire_messages(system, messages),
            temperature: Some(defaults::GEN_TEMPERATURE),
            max_tokens: Some(defaults::GEN_MAX_TOKENS),
            stream: true,
            tools: vec![],
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "Upstream returned {}",
                response.status()
            )));
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

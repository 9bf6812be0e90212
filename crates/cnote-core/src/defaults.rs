//! Centralized default constants for the cnote system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum characters per chunk for text splitting.
pub const CHUNK_SIZE: usize = 500;

/// Overlap characters between adjacent chunks for search-recall robustness.
pub const CHUNK_OVERLAP: usize = 50;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name.
pub const EMBED_MODEL: &str = "text-embedding-3-small";

/// Default embedding vector dimension for text-embedding-3-small.
pub const EMBED_DIMENSION: usize = 1536;

/// Number of texts sent per embedding request, bounding upstream payloads.
pub const EMBED_BATCH_SIZE: usize = 10;

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// COMPLETION
// =============================================================================

/// Default chat completion model name.
pub const GEN_MODEL: &str = "deepseek-chat";

/// Timeout for completion requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Sampling temperature for chat completions.
pub const GEN_TEMPERATURE: f32 = 0.7;

/// Maximum tokens per completion response.
pub const GEN_MAX_TOKENS: u32 = 2000;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Chunks returned by the legacy direct-retrieval chat mode.
pub const SEARCH_TOP_K: i64 = 3;

/// Minimum cosine similarity for a chunk to count as relevant.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// Default result limit for keyword tool searches.
pub const TOOL_SEARCH_LIMIT: i64 = 5;

/// Default result limit for recent-note listings.
pub const LIST_RECENT_LIMIT: i64 = 10;

/// Default result limit for shared-note listings.
pub const LIST_SHARED_LIMIT: i64 = 20;

/// Excerpt length in characters for search results and listings.
pub const EXCERPT_LENGTH: usize = 200;

// =============================================================================
// CONVERSATION
// =============================================================================

/// Persisted messages replayed into the model per turn.
pub const HISTORY_WINDOW: i64 = 10;

/// Hard cap on completion calls per turn; bounds latency and guards
/// against run-away tool-call cycles.
pub const MAX_TOOL_ITERATIONS: usize = 5;

/// Answer returned when the iteration cap is hit with no content.
pub const FALLBACK_ANSWER: &str = "I wasn't able to generate a response.";

// =============================================================================
// JOBS
// =============================================================================

/// Polling interval when the job queue is empty (milliseconds).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Attempts before a re-index job is marked permanently failed.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

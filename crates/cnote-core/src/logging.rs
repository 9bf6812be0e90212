//! Structured logging field name constants for cnote.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (search hits, chunks) |

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "jobs", "chat"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "embed_texts", "reindex", "run_turn", "search"
pub const OPERATION: &str = "op";

/// User UUID the operation acts on behalf of.
pub const USER_ID: &str = "user_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks processed (chunking, embedding, replace).
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of input texts sent to the embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Namespaced tool name being executed.
pub const TOOL: &str = "tool";

/// Orchestrator loop iteration (1-based).
pub const ITERATION: &str = "iteration";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

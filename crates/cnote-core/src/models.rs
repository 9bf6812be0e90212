//! Core data model types for cnote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub use pgvector::Vector;

use crate::defaults;

// =============================================================================
// NOTES
// =============================================================================

/// A user-owned note. Mutation happens only through the note store;
/// deleting a note cascades to its chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact note row for listings and tool search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub updated_at: DateTime<Utc>,
}

/// A note visible to the caller through an active share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedNote {
    pub note_id: Uuid,
    pub title: String,
    pub content: String,
    pub owner_id: Uuid,
    pub owner_username: String,
    /// "read" or "write"; this core only ever reads.
    pub permission: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for creating a note.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_shared: bool,
}

/// Request for updating a note. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_shared: Option<bool>,
}

// =============================================================================
// CHUNKS & SEARCH
// =============================================================================

/// One embedded segment of a note. Chunk sets are regenerated wholesale
/// on every re-index; indices are contiguous from 0.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: i64,
    pub note_id: Uuid,
    pub owner_id: Uuid,
    pub chunk_index: i32,
    pub text: String,
    pub vector: Vector,
}

/// A vector search hit with its provenance annotation. Transient, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub note_id: Uuid,
    pub title: String,
    pub chunk_text: String,
    pub similarity: f32,
    pub is_own_note: bool,
    /// Owner handle when the note arrived via a share.
    pub owner_username: Option<String>,
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
            ChatRole::System => "system",
        }
    }

    /// Parse a stored role string. Unknown strings map to System so a
    /// corrupt row is excluded from replay rather than misattributed.
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            "tool" => ChatRole::Tool,
            _ => ChatRole::System,
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted conversation message. Append-only, per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// TOOL CALLING
// =============================================================================

/// Schema-described capability exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Namespaced name as exposed to the model (e.g. `private_search_notes`).
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the parameters.
    pub parameters: JsonValue,
}

/// A model-issued request to invoke a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed back in the tool result message.
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

/// Outcome of one tool call, kept for the turn's audit trail.
/// Errors are payloads here, never turn-level failures.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: JsonValue,
    pub result: JsonValue,
    pub is_error: bool,
}

/// One message in a completion request.
#[derive(Debug, Clone)]
pub struct CompletionMessage {
    pub role: ChatRole,
    pub content: String,
    /// Assistant messages that requested tools carry the requests.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Tool messages echo the call id they answer.
    pub tool_call_id: Option<String>,
}

impl CompletionMessage {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(content: String, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: String) -> Self {
        Self {
            role: ChatRole::Tool,
            content,
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Model output for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    /// Empty when the model produced a final answer.
    pub tool_calls: Vec<ToolCallRequest>,
}

// =============================================================================
// JOBS
// =============================================================================

/// Background job kind. Hashable so the worker can key its handler map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Re-chunk and re-embed one note.
    Reindex,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Reindex => "reindex",
        }
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// A queued background job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub note_id: Uuid,
    pub job_type: JobType,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// TEXT HELPERS
// =============================================================================

/// Char-safe excerpt of at most [`defaults::EXCERPT_LENGTH`] characters,
/// with an ellipsis when truncated.
pub fn excerpt(content: &str) -> String {
    excerpt_with(content, defaults::EXCERPT_LENGTH)
}

/// Char-safe excerpt with an explicit length cap.
pub fn excerpt_with(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

//! Core traits for cnote abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE STORE
// =============================================================================

/// Read/write access to a user's own notes.
///
/// The relational note store itself is an external collaborator; this
/// trait is the surface the chat engine queries through. Every method is
/// scoped by the owner: a note id that exists but belongs to someone
/// else behaves exactly like a missing one.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a new note for the owner.
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note>;

    /// Update a note owned by the caller.
    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Delete a note owned by the caller. Chunks cascade.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()>;

    /// Fetch a full note owned by the caller.
    async fn fetch_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Note>;

    /// Fetch a note by id alone, without an owner scope. For internal
    /// pipelines such as the re-index worker.
    async fn fetch_by_id(&self, id: Uuid) -> Result<Note>;

    /// Keyword search over the caller's own notes (title + content).
    async fn search_owned(&self, owner_id: Uuid, query: &str, limit: i64)
        -> Result<Vec<NoteSummary>>;

    /// Most recently updated notes owned by the caller.
    async fn list_recent_owned(&self, owner_id: Uuid, limit: i64) -> Result<Vec<NoteSummary>>;
}

// =============================================================================
// SHARE STORE
// =============================================================================

/// Read access to notes shared with a user.
///
/// Share validity is determined by the external share relation at query
/// time; nothing here is cached, so revoking a share takes effect on the
/// next call.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Fetch a shared note, re-validating that an active share exists
    /// for the caller. Absent share and absent note are indistinguishable.
    async fn fetch_shared(&self, user_id: Uuid, note_id: Uuid) -> Result<SharedNote>;

    /// All notes currently shared with the caller, most recent first.
    async fn list_shared(&self, user_id: Uuid, limit: i64) -> Result<Vec<SharedNote>>;

    /// Keyword search over notes shared with the caller.
    async fn search_shared(&self, user_id: Uuid, query: &str, limit: i64)
        -> Result<Vec<SharedNote>>;

    /// Notes shared with the caller by one specific friend.
    async fn list_by_friend(&self, user_id: Uuid, friend_username: &str)
        -> Result<Vec<SharedNote>>;
}

// =============================================================================
// CHUNK REPOSITORY
// =============================================================================

/// Storage and similarity search for embedded note chunks.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Atomically replace the chunk set for a note. Chunk indices are
    /// assigned from the slice order, contiguous from 0.
    async fn replace_for_note(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        chunks: Vec<(String, Vector)>,
    ) -> Result<()>;

    /// All chunks for a note, ordered by chunk index.
    async fn get_for_note(&self, note_id: Uuid) -> Result<Vec<Chunk>>;

    /// Delete all chunks for a note.
    async fn delete_for_note(&self, note_id: Uuid) -> Result<()>;

    /// Top-K cosine-similarity search over chunks the requester may read
    /// (own notes plus active shares). Results are ordered by similarity
    /// descending, never exceed `top_k`, and never fall below
    /// `min_similarity`. Zero candidates yields an empty vec.
    async fn search(
        &self,
        requester_id: Uuid,
        query_vec: &Vector,
        top_k: i64,
        min_similarity: f32,
    ) -> Result<Vec<SearchResult>>;
}

// =============================================================================
// CHAT HISTORY
// =============================================================================

/// Append-only conversation history, one stream per user.
#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    /// Persist one message.
    async fn append(&self, user_id: Uuid, role: ChatRole, content: &str)
        -> Result<ChatMessageRecord>;

    /// Last `limit` non-system messages in chronological order.
    async fn recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ChatMessageRecord>>;

    /// Full history in chronological order.
    async fn all(&self, user_id: Uuid) -> Result<Vec<ChatMessageRecord>>;

    /// Purge the caller's history.
    async fn clear(&self, user_id: Uuid) -> Result<()>;
}

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Durable queue for background re-indexing.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a re-index job for a note. Deduplicated: an already-pending
    /// job for the same note is returned instead of inserting another.
    async fn queue_reindex(&self, note_id: Uuid) -> Result<Uuid>;

    /// Claim the oldest pending job, marking it running. Returns `None`
    /// when the queue is empty.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a job done.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Record a failure. With `retry`, the job returns to pending for
    /// another attempt; otherwise it is marked failed.
    async fn fail(&self, job_id: Uuid, error: &str, retry: bool) -> Result<()>;

    /// Drop pending jobs for a note (note deleted).
    async fn cancel_for_note(&self, note_id: Uuid) -> Result<()>;
}

// =============================================================================
// INFERENCE BACKENDS
// =============================================================================

/// Embedding model client.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts. Order-preserving: output\[i\] corresponds
    /// to input\[i\], one vector per text, uniform dimension. Fails as a
    /// whole if any upstream batch fails.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed_texts(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("empty embedding response".into()))
    }

    /// Vector dimension produced by this backend.
    fn dimension(&self) -> usize;

    /// Model identifier, for logging and stored-chunk attribution.
    fn model_name(&self) -> &str;
}

/// Chat completion model client with tool-calling support.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One completion call: system prompt, conversation so far, and the
    /// tools the model may request. The response carries either final
    /// content or tool-call requests.
    async fn complete(
        &self,
        system: &str,
        messages: &[CompletionMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionResponse>;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

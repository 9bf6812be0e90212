//! # cnote-db
//!
//! PostgreSQL database layer for cnote.
//!
//! This crate provides:
//! - Connection pool management
//! - Sliding-window text chunking for embeddings
//! - Repository implementations for notes, shares, chunks, chat history,
//!   and the background job queue
//! - Vector similarity search with pgvector

pub mod chat;
pub mod chunking;
pub mod chunks;
pub mod jobs;
pub mod notes;
pub mod pool;
pub mod shares;

// Re-export core types
pub use cnote_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub use chat::PgChatHistoryRepository;
pub use chunking::{chunk_text, chunk_text_with, prepare_note_text, ChunkerConfig, TextChunk};
pub use chunks::PgChunkRepository;
pub use jobs::PgJobRepository;
pub use notes::PgNoteStore;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use shares::PgShareStore;

use std::sync::Arc;

/// Aggregated database handle shared across the API and job worker.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note store for the caller's own notes.
    pub notes: Arc<PgNoteStore>,
    /// Shared-note store (active shares only).
    pub shares: Arc<PgShareStore>,
    /// Chunk repository for vector storage and search.
    pub chunks: Arc<PgChunkRepository>,
    /// Conversation history.
    pub chat: Arc<PgChatHistoryRepository>,
    /// Background job queue.
    pub jobs: Arc<PgJobRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: Arc::new(PgNoteStore::new(pool.clone())),
            shares: Arc::new(PgShareStore::new(pool.clone())),
            chunks: Arc::new(PgChunkRepository::new(pool.clone())),
            chat: Arc::new(PgChatHistoryRepository::new(pool.clone())),
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            pool,
        }
    }

    /// Connect to the database and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {}", e)))?;
        Ok(Self::new(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_done\\"), "50\\%\\_done\\\\");
    }

    #[test]
    fn test_escape_like_plain_text_unchanged() {
        assert_eq!(escape_like("trip plan"), "trip plan");
    }
}

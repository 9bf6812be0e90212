//! Re-index handler: re-chunk and re-embed one note.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use cnote_core::{ChunkRepository, EmbeddingBackend, Error, JobType, NoteStore};
use cnote_db::{chunk_text_with, prepare_note_text, ChunkerConfig};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler that rebuilds the chunk set and embeddings for a note.
///
/// Runs after every note create and update. The note is re-read at
/// execution time, so a burst of edits collapses into indexing whatever
/// content is current when the job runs.
pub struct ReindexHandler {
    notes: Arc<dyn NoteStore>,
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    chunker: ChunkerConfig,
}

impl ReindexHandler {
    /// Create a new re-index handler.
    pub fn new(
        notes: Arc<dyn NoteStore>,
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            notes,
            chunks,
            embedder,
            chunker: ChunkerConfig::default(),
        }
    }

    /// Override the chunker configuration.
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }
}

#[async_trait]
impl JobHandler for ReindexHandler {
    fn job_type(&self) -> JobType {
        JobType::Reindex
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let note_id = ctx.note_id();

        let note = match self.notes.fetch_by_id(note_id).await {
            Ok(note) => note,
            Err(Error::NoteNotFound(_)) => {
                // Deleted between queueing and execution; nothing to index.
                debug!(%note_id, "Note gone, skipping re-index");
                return JobResult::Success(Some(json!({ "skipped": "note deleted" })));
            }
            Err(e) => return JobResult::Retry(format!("Failed to load note: {}", e)),
        };

        let text = prepare_note_text(&note.title, &note.content);
        let text_chunks = chunk_text_with(&text, &self.chunker);

        if text_chunks.is_empty() {
            if let Err(e) = self.chunks.delete_for_note(note_id).await {
                return JobResult::Retry(format!("Failed to clear chunks: {}", e));
            }
            return JobResult::Success(Some(json!({ "chunk_count": 0 })));
        }

        let texts: Vec<String> = text_chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.embedder.embed_texts(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => return JobResult::Retry(format!("Embedding failed: {}", e)),
        };

        let pairs: Vec<_> = texts.into_iter().zip(vectors).collect();
        let chunk_count = pairs.len();

        if let Err(e) = self
            .chunks
            .replace_for_note(note_id, note.owner_id, pairs)
            .await
        {
            return JobResult::Retry(format!("Failed to store chunks: {}", e));
        }

        info!(
            %note_id,
            chunk_count,
            model = self.embedder.model_name(),
            "Note re-indexed"
        );

        JobResult::Success(Some(json!({ "chunk_count": chunk_count })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cnote_core::{
        Chunk, CreateNoteRequest, Job, Note, NoteSummary, Result, SearchResult,
        UpdateNoteRequest, Vector,
    };
    use cnote_inference::MockInferenceBackend;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeNoteStore {
        notes: Mutex<HashMap<Uuid, Note>>,
    }

    impl FakeNoteStore {
        fn with_note(note: Note) -> Self {
            let mut notes = HashMap::new();
            notes.insert(note.id, note);
            Self {
                notes: Mutex::new(notes),
            }
        }

        fn empty() -> Self {
            Self {
                notes: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl NoteStore for FakeNoteStore {
        async fn insert(&self, _owner_id: Uuid, _req: CreateNoteRequest) -> Result<Note> {
            unimplemented!()
        }

        async fn update(
            &self,
            _owner_id: Uuid,
            _id: Uuid,
            _req: UpdateNoteRequest,
        ) -> Result<Note> {
            unimplemented!()
        }

        async fn delete(&self, _owner_id: Uuid, _id: Uuid) -> Result<()> {
            unimplemented!()
        }

        async fn fetch_owned(&self, _owner_id: Uuid, _id: Uuid) -> Result<Note> {
            unimplemented!()
        }

        async fn fetch_by_id(&self, id: Uuid) -> Result<Note> {
            self.notes
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(Error::NoteNotFound(id))
        }

        async fn search_owned(
            &self,
            _owner_id: Uuid,
            _query: &str,
            _limit: i64,
        ) -> Result<Vec<NoteSummary>> {
            unimplemented!()
        }

        async fn list_recent_owned(&self, _owner_id: Uuid, _limit: i64) -> Result<Vec<NoteSummary>> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct FakeChunkRepo {
        stored: Mutex<Vec<(Uuid, Uuid, Vec<(String, Vector)>)>>,
        deleted: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl ChunkRepository for FakeChunkRepo {
        async fn replace_for_note(
            &self,
            note_id: Uuid,
            owner_id: Uuid,
            chunks: Vec<(String, Vector)>,
        ) -> Result<()> {
            self.stored.lock().unwrap().push((note_id, owner_id, chunks));
            Ok(())
        }

        async fn get_for_note(&self, _note_id: Uuid) -> Result<Vec<Chunk>> {
            unimplemented!()
        }

        async fn delete_for_note(&self, note_id: Uuid) -> Result<()> {
            self.deleted.lock().unwrap().push(note_id);
            Ok(())
        }

        async fn search(
            &self,
            _requester_id: Uuid,
            _query_vec: &Vector,
            _top_k: i64,
            _min_similarity: f32,
        ) -> Result<Vec<SearchResult>> {
            unimplemented!()
        }
    }

    fn note(title: &str, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            is_shared: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn job_for(note_id: Uuid) -> JobContext {
        JobContext::new(Job {
            id: Uuid::new_v4(),
            note_id,
            job_type: JobType::Reindex,
            attempts: 1,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_reindex_stores_chunks_with_vectors() {
        let n = note("Trip plan", "Fly to Kyoto in April, visit temples.");
        let note_id = n.id;
        let owner_id = n.owner_id;

        let notes = Arc::new(FakeNoteStore::with_note(n));
        let chunks = Arc::new(FakeChunkRepo::default());
        let embedder = Arc::new(MockInferenceBackend::new());

        let handler = ReindexHandler::new(notes, chunks.clone(), embedder.clone());
        let result = handler.execute(job_for(note_id)).await;

        assert!(matches!(result, JobResult::Success(Some(_))));
        let stored = chunks.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, note_id);
        assert_eq!(stored[0].1, owner_id);
        assert_eq!(stored[0].2.len(), 1);
        assert!(stored[0].2[0].0.starts_with("Trip plan"));
        assert_eq!(embedder.embed_call_count(), 1);
    }

    #[tokio::test]
    async fn test_reindex_long_note_produces_multiple_chunks() {
        let body = "word ".repeat(300);
        let n = note("Long note", &body);
        let note_id = n.id;

        let notes = Arc::new(FakeNoteStore::with_note(n));
        let chunks = Arc::new(FakeChunkRepo::default());
        let embedder = Arc::new(MockInferenceBackend::new());

        let handler = ReindexHandler::new(notes, chunks.clone(), embedder);
        let result = handler.execute(job_for(note_id)).await;

        assert!(matches!(result, JobResult::Success(Some(_))));
        let stored = chunks.stored.lock().unwrap();
        assert!(stored[0].2.len() > 1);
        // One vector per chunk.
        for (text, vector) in &stored[0].2 {
            assert!(!text.is_empty());
            assert!(!vector.as_slice().is_empty());
        }
    }

    #[tokio::test]
    async fn test_reindex_empty_note_clears_chunks() {
        let n = note("", "   ");
        let note_id = n.id;

        let notes = Arc::new(FakeNoteStore::with_note(n));
        let chunks = Arc::new(FakeChunkRepo::default());
        let embedder = Arc::new(MockInferenceBackend::new());

        let handler = ReindexHandler::new(notes, chunks.clone(), embedder.clone());
        let result = handler.execute(job_for(note_id)).await;

        assert!(matches!(result, JobResult::Success(Some(_))));
        assert_eq!(*chunks.deleted.lock().unwrap(), vec![note_id]);
        assert!(chunks.stored.lock().unwrap().is_empty());
        assert_eq!(embedder.embed_call_count(), 0);
    }

    #[tokio::test]
    async fn test_reindex_missing_note_succeeds_without_work() {
        let notes = Arc::new(FakeNoteStore::empty());
        let chunks = Arc::new(FakeChunkRepo::default());
        let embedder = Arc::new(MockInferenceBackend::new());

        let handler = ReindexHandler::new(notes, chunks.clone(), embedder);
        let result = handler.execute(job_for(Uuid::new_v4())).await;

        assert!(matches!(result, JobResult::Success(Some(_))));
        assert!(chunks.stored.lock().unwrap().is_empty());
        assert!(chunks.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_embedding_failure_requests_retry() {
        let n = note("Trip plan", "Fly to Kyoto.");
        let note_id = n.id;

        let notes = Arc::new(FakeNoteStore::with_note(n));
        let chunks = Arc::new(FakeChunkRepo::default());
        let embedder = Arc::new(MockInferenceBackend::new().with_failing_embeddings());

        let handler = ReindexHandler::new(notes, chunks.clone(), embedder);
        let result = handler.execute(job_for(note_id)).await;

        match result {
            JobResult::Retry(msg) => assert!(msg.contains("Embedding failed")),
            other => panic!("expected retry, got {:?}", other),
        }
        assert!(chunks.stored.lock().unwrap().is_empty());
    }
}

//! Chunk repository: embedded note segments and vector similarity search.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use cnote_core::{Chunk, ChunkRepository, Error, Result, SearchResult};

/// PostgreSQL + pgvector implementation of ChunkRepository.
pub struct PgChunkRepository {
    pool: Pool<Postgres>,
}

impl PgChunkRepository {
    /// Create a new PgChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkRepository for PgChunkRepository {
    async fn replace_for_note(
        &self,
        note_id: Uuid,
        owner_id: Uuid,
        chunks: Vec<(String, Vector)>,
    ) -> Result<()> {
        // Full regeneration: the old set goes away in the same
        // transaction that installs the new one, so readers never see a
        // partially patched chunk set.
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM note_chunk WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let count = chunks.len();
        for (index, (text, vector)) in chunks.into_iter().enumerate() {
            sqlx::query(
                "INSERT INTO note_chunk (note_id, owner_id, chunk_index, text, vector)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(note_id)
            .bind(owner_id)
            .bind(index as i32)
            .bind(&text)
            .bind(&vector)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(note_id = %note_id, chunk_count = count, "Replaced chunk set");
        Ok(())
    }

    async fn get_for_note(&self, note_id: Uuid) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, note_id, owner_id, chunk_index, text, vector
             FROM note_chunk
             WHERE note_id = $1
             ORDER BY chunk_index",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Chunk {
                id: row.get("id"),
                note_id: row.get("note_id"),
                owner_id: row.get("owner_id"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                vector: row.get("vector"),
            })
            .collect())
    }

    async fn delete_for_note(&self, note_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM note_chunk WHERE note_id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn search(
        &self,
        requester_id: Uuid,
        query_vec: &Vector,
        top_k: i64,
        min_similarity: f32,
    ) -> Result<Vec<SearchResult>> {
        // Candidate set: requester-owned chunks plus chunks of notes with
        // an active share, evaluated at query time. Ties on similarity
        // break on chunk id, i.e. insertion order.
        let rows = sqlx::query(
            r#"
            SELECT c.note_id,
                   n.title,
                   c.text AS chunk_text,
                   1.0 - (c.vector <=> $2) AS similarity,
                   (n.owner_id = $1) AS is_own_note,
                   p.username AS owner_username
            FROM note_chunk c
            JOIN note n ON n.id = c.note_id
            JOIN profile p ON p.id = n.owner_id
            WHERE (c.owner_id = $1
                   OR EXISTS (SELECT 1 FROM note_share s
                              WHERE s.note_id = c.note_id AND s.shared_with = $1))
              AND 1.0 - (c.vector <=> $2) >= $3
            ORDER BY similarity DESC, c.id
            LIMIT $4
            "#,
        )
        .bind(requester_id)
        .bind(query_vec)
        .bind(min_similarity as f64)
        .bind(top_k)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let results: Vec<SearchResult> = rows
            .into_iter()
            .map(|row| {
                let is_own_note: bool = row.get("is_own_note");
                SearchResult {
                    note_id: row.get("note_id"),
                    title: row.get("title"),
                    chunk_text: row.get("chunk_text"),
                    similarity: row.get::<f64, _>("similarity") as f32,
                    is_own_note,
                    owner_username: if is_own_note {
                        None
                    } else {
                        Some(row.get("owner_username"))
                    },
                }
            })
            .collect();

        debug!(
            user_id = %requester_id,
            result_count = results.len(),
            "Vector search complete"
        );
        Ok(results)
    }
}

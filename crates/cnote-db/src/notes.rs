//! Note store implementation, scoped to the owning user.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cnote_core::{
    excerpt, CreateNoteRequest, Error, Note, NoteStore, NoteSummary, Result, UpdateNoteRequest,
};

use crate::escape_like;

/// PostgreSQL implementation of NoteStore.
pub struct PgNoteStore {
    pool: Pool<Postgres>,
}

impl PgNoteStore {
    /// Create a new PgNoteStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn note_from_row(row: &sqlx::postgres::PgRow) -> Note {
        Note {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            content: row.get("content"),
            is_shared: row.get("is_shared"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("title: must not be empty".into()));
        }

        let row = sqlx::query(
            "INSERT INTO note (id, owner_id, title, content, is_shared)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, owner_id, title, content, is_shared, created_at, updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.is_shared)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::note_from_row(&row))
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let row = sqlx::query(
            "UPDATE note
             SET title = COALESCE($3, title),
                 content = COALESCE($4, content),
                 is_shared = COALESCE($5, is_shared),
                 updated_at = now()
             WHERE id = $1 AND owner_id = $2
             RETURNING id, owner_id, title, content, is_shared, created_at, updated_at",
        )
        .bind(id)
        .bind(owner_id)
        .bind(req.title.as_deref())
        .bind(req.content.as_deref())
        .bind(req.is_shared)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| Self::note_from_row(&r))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn fetch_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Note> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, content, is_shared, created_at, updated_at
             FROM note
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| Self::note_from_row(&r))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, content, is_shared, created_at, updated_at
             FROM note
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| Self::note_from_row(&r))
            .ok_or(Error::NoteNotFound(id))
    }

    async fn search_owned(
        &self,
        owner_id: Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<NoteSummary>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(
            "SELECT id, title, content, updated_at
             FROM note
             WHERE owner_id = $1 AND (title ILIKE $2 OR content ILIKE $2)
             ORDER BY updated_at DESC
             LIMIT $3",
        )
        .bind(owner_id)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| NoteSummary {
                id: row.get("id"),
                title: row.get("title"),
                excerpt: excerpt(row.get::<String, _>("content").as_str()),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn list_recent_owned(&self, owner_id: Uuid, limit: i64) -> Result<Vec<NoteSummary>> {
        let rows = sqlx::query(
            "SELECT id, title, content, updated_at
             FROM note
             WHERE owner_id = $1
             ORDER BY updated_at DESC
             LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| NoteSummary {
                id: row.get("id"),
                title: row.get("title"),
                excerpt: excerpt(row.get::<String, _>("content").as_str()),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }
}

//! Shared-note store: notes visible to a user through active shares.
//!
//! Share validity is checked against the `note_share` relation at query
//! time, never cached, so a revoked share disappears from the very next
//! call.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cnote_core::{Error, Result, ShareStore, SharedNote};

use crate::escape_like;

const SHARED_NOTE_COLUMNS: &str =
    "n.id AS note_id, n.title, n.content, n.owner_id, p.username AS owner_username,
     s.permission, n.created_at, n.updated_at";

/// PostgreSQL implementation of ShareStore.
pub struct PgShareStore {
    pool: Pool<Postgres>,
}

impl PgShareStore {
    /// Create a new PgShareStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn shared_from_row(row: &sqlx::postgres::PgRow) -> SharedNote {
        SharedNote {
            note_id: row.get("note_id"),
            title: row.get("title"),
            content: row.get("content"),
            owner_id: row.get("owner_id"),
            owner_username: row.get("owner_username"),
            permission: row.get("permission"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ShareStore for PgShareStore {
    async fn fetch_shared(&self, user_id: Uuid, note_id: Uuid) -> Result<SharedNote> {
        let query = format!(
            "SELECT {SHARED_NOTE_COLUMNS}
             FROM note_share s
             JOIN note n ON n.id = s.note_id
             JOIN profile p ON p.id = n.owner_id
             WHERE s.note_id = $1 AND s.shared_with = $2"
        );

        let row = sqlx::query(&query)
            .bind(note_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        // Missing note and missing share are indistinguishable.
        row.map(|r| Self::shared_from_row(&r))
            .ok_or(Error::NoteNotFound(note_id))
    }

    async fn list_shared(&self, user_id: Uuid, limit: i64) -> Result<Vec<SharedNote>> {
        let query = format!(
            "SELECT {SHARED_NOTE_COLUMNS}
             FROM note_share s
             JOIN note n ON n.id = s.note_id
             JOIN profile p ON p.id = n.owner_id
             WHERE s.shared_with = $1
             ORDER BY n.updated_at DESC
             LIMIT $2"
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::shared_from_row).collect())
    }

    async fn search_shared(
        &self,
        user_id: Uuid,
        query_text: &str,
        limit: i64,
    ) -> Result<Vec<SharedNote>> {
        let pattern = format!("%{}%", escape_like(query_text));
        let query = format!(
            "SELECT {SHARED_NOTE_COLUMNS}
             FROM note_share s
             JOIN note n ON n.id = s.note_id
             JOIN profile p ON p.id = n.owner_id
             WHERE s.shared_with = $1 AND (n.title ILIKE $2 OR n.content ILIKE $2)
             ORDER BY n.updated_at DESC
             LIMIT $3"
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::shared_from_row).collect())
    }

    async fn list_by_friend(
        &self,
        user_id: Uuid,
        friend_username: &str,
    ) -> Result<Vec<SharedNote>> {
        let query = format!(
            "SELECT {SHARED_NOTE_COLUMNS}
             FROM note_share s
             JOIN note n ON n.id = s.note_id
             JOIN profile p ON p.id = n.owner_id
             WHERE s.shared_with = $1 AND p.username = $2
             ORDER BY n.updated_at DESC"
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(friend_username)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::shared_from_row).collect())
    }
}

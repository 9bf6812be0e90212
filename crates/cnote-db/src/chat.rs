//! Chat history repository: append-only conversation storage per user.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cnote_core::{ChatHistoryRepository, ChatMessageRecord, ChatRole, Error, Result};

/// PostgreSQL implementation of ChatHistoryRepository.
pub struct PgChatHistoryRepository {
    pool: Pool<Postgres>,
}

impl PgChatHistoryRepository {
    /// Create a new PgChatHistoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> ChatMessageRecord {
        ChatMessageRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            role: ChatRole::parse(row.get::<String, _>("role").as_str()),
            content: row.get("content"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ChatHistoryRepository for PgChatHistoryRepository {
    async fn append(
        &self,
        user_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessageRecord> {
        let row = sqlx::query(
            "INSERT INTO chat_message (id, user_id, role, content)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, role, content, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::record_from_row(&row))
    }

    async fn recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ChatMessageRecord>> {
        // Fetch newest-first, then reverse to chronological. System rows
        // never replay into the model.
        let rows = sqlx::query(
            "SELECT id, user_id, role, content, created_at
             FROM chat_message
             WHERE user_id = $1 AND role <> 'system'
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut messages: Vec<ChatMessageRecord> =
            rows.iter().map(Self::record_from_row).collect();
        messages.reverse();
        Ok(messages)
    }

    async fn all(&self, user_id: Uuid) -> Result<Vec<ChatMessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, content, created_at
             FROM chat_message
             WHERE user_id = $1
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::record_from_row).collect())
    }

    async fn clear(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM chat_message WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

//! Job queue repository for background re-indexing.
//!
//! The queue is a Postgres table claimed with `FOR UPDATE SKIP LOCKED`,
//! so multiple workers never double-process a job and a crashed worker's
//! claim expires with its transaction.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cnote_core::{defaults, Error, Job, JobRepository, JobType, Result};

/// PostgreSQL implementation of JobRepository.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
    max_attempts: i32,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            max_attempts: defaults::JOB_MAX_ATTEMPTS,
        }
    }

    /// Override the retry budget (tests).
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue_reindex(&self, note_id: Uuid) -> Result<Uuid> {
        // Deduplicated: a pending job for the same note is reused. The
        // re-index reads the note fresh when it runs, so one pending job
        // covers any number of intervening writes.
        if let Some(row) = sqlx::query(
            "SELECT id FROM job
             WHERE note_id = $1 AND job_type = 'reindex' AND status = 'pending'",
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        {
            return Ok(row.get("id"));
        }

        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO job (id, note_id, job_type, status)
             VALUES ($1, $2, 'reindex', 'pending')",
        )
        .bind(id)
        .bind(note_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let row = sqlx::query(
            "UPDATE job
             SET status = 'running', attempts = attempts + 1, updated_at = now()
             WHERE id = (
                 SELECT id FROM job
                 WHERE status = 'pending'
                 ORDER BY created_at
                 FOR UPDATE SKIP LOCKED
                 LIMIT 1
             )
             RETURNING id, note_id, attempts, created_at",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| Job {
            id: row.get("id"),
            note_id: row.get("note_id"),
            job_type: JobType::Reindex,
            attempts: row.get("attempts"),
            created_at: row.get("created_at"),
        }))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE job SET status = 'done', updated_at = now() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, retry: bool) -> Result<()> {
        // Retryable failures go back to pending until the attempt budget
        // runs out; the job then stays failed with its last error visible.
        let status = if retry { "pending" } else { "failed" };
        sqlx::query(
            "UPDATE job
             SET status = CASE WHEN attempts >= $3 THEN 'failed' ELSE $2 END,
                 last_error = $4,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(status)
        .bind(self.max_attempts)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn cancel_for_note(&self, note_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM job WHERE note_id = $1 AND status = 'pending'")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

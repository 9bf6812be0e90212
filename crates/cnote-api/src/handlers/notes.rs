//! Note CRUD endpoints. Every content mutation queues a re-index job.

use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use cnote_core::{CreateNoteRequest, Error, JobRepository, NoteStore, UpdateNoteRequest};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    if body.title.trim().is_empty() {
        return Err(Error::InvalidInput("title: must not be empty".into()).into());
    }

    let note = state.db.notes.insert(caller.user_id, body).await?;
    let job_id = state.db.jobs.queue_reindex(note.id).await?;
    debug!(note_id = %note.id, job_id = %job_id, "Queued re-index for new note");

    Ok(Json(json!({ "note": note })))
}

/// PUT /api/notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    let note = state.db.notes.update(caller.user_id, id, body).await?;
    let job_id = state.db.jobs.queue_reindex(note.id).await?;
    debug!(note_id = %note.id, job_id = %job_id, "Queued re-index for updated note");

    Ok(Json(json!({ "note": note })))
}

/// DELETE /api/notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<JsonValue>, ApiError> {
    delete_and_cancel(
        state.db.notes.as_ref(),
        state.db.jobs.as_ref(),
        caller.user_id,
        id,
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}

/// The ownership check lives in the note store; pending re-index jobs
/// for the note are dropped only once that delete has succeeded.
async fn delete_and_cancel(
    notes: &dyn NoteStore,
    jobs: &dyn JobRepository,
    owner_id: Uuid,
    id: Uuid,
) -> cnote_core::Result<()> {
    notes.delete(owner_id, id).await?;
    jobs.cancel_for_note(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cnote_core::{Job, Note, NoteSummary, Result};
    use std::sync::Mutex;

    struct FakeNoteStore {
        owner_id: Uuid,
        note_id: Uuid,
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

        async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
            if owner_id == self.owner_id && id == self.note_id {
                Ok(())
            } else {
                Err(Error::NoteNotFound(id))
            }
        }

        async fn fetch_owned(&self, _owner_id: Uuid, _id: Uuid) -> Result<Note> {
            unimplemented!()
        }

        async fn fetch_by_id(&self, _id: Uuid) -> Result<Note> {
            unimplemented!()
        }

        async fn search_owned(
            &self,
            _owner_id: Uuid,
            _query: &str,
            _limit: i64,
        ) -> Result<Vec<NoteSummary>> {
            unimplemented!()
        }

        async fn list_recent_owned(
            &self,
            _owner_id: Uuid,
            _limit: i64,
        ) -> Result<Vec<NoteSummary>> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct FakeJobRepo {
        cancelled: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl JobRepository for FakeJobRepo {
        async fn queue_reindex(&self, _note_id: Uuid) -> Result<Uuid> {
            unimplemented!()
        }

        async fn claim_next(&self) -> Result<Option<Job>> {
            unimplemented!()
        }

        async fn complete(&self, _job_id: Uuid) -> Result<()> {
            unimplemented!()
        }

        async fn fail(&self, _job_id: Uuid, _error: &str, _retry: bool) -> Result<()> {
            unimplemented!()
        }

        async fn cancel_for_note(&self, note_id: Uuid) -> Result<()> {
            self.cancelled.lock().unwrap().push(note_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delete_cancels_jobs_after_owned_delete() {
        let owner = Uuid::new_v4();
        let note_id = Uuid::new_v4();
        let notes = FakeNoteStore { owner_id: owner, note_id };
        let jobs = FakeJobRepo::default();

        delete_and_cancel(&notes, &jobs, owner, note_id)
            .await
            .unwrap();

        assert_eq!(*jobs.cancelled.lock().unwrap(), vec![note_id]);
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_leaves_jobs_queued() {
        let owner = Uuid::new_v4();
        let note_id = Uuid::new_v4();
        let notes = FakeNoteStore { owner_id: owner, note_id };
        let jobs = FakeJobRepo::default();

        let result = delete_and_cancel(&notes, &jobs, Uuid::new_v4(), note_id).await;

        assert!(matches!(result, Err(Error::NoteNotFound(_))));
        assert!(jobs.cancelled.lock().unwrap().is_empty());
    }
}

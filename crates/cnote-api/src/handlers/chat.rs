//! Chat endpoint: tool-calling turns, legacy retrieval mode, history.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use cnote_chat::{build_context_block, retrieval_system_prompt};
use cnote_core::{
    defaults, ChatHistoryRepository, ChatRole, ChunkRepository, CompletionBackend,
    CompletionMessage, EmbeddingBackend, Error, SearchResult,
};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    /// `retrieval` selects the legacy single-shot mode.
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ContextEntry {
    note_id: Uuid,
    title: String,
    similarity: f32,
    is_own_note: bool,
    owner_username: Option<String>,
}

impl From<&SearchResult> for ContextEntry {
    fn from(result: &SearchResult) -> Self {
        Self {
            note_id: result.note_id,
            title: result.title.clone(),
            similarity: result.similarity,
            is_own_note: result.is_own_note,
            owner_username: result.owner_username.clone(),
        }
    }
}

/// POST /api/chat
pub async fn post_chat(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ChatParams>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    match params.mode.as_deref() {
        Some("retrieval") => retrieval_turn(&state, caller.user_id, &body.message).await,
        Some(other) => Err(ApiError::BadRequest(format!("mode: unknown value '{}'", other))),
        None => {
            let turn = state
                .orchestrator
                .run_turn(caller.user_id, &body.message)
                .await?;
            Ok(Json(json!({
                "message": turn.message,
                "tool_calls": turn.tool_calls,
            })))
        }
    }
}

/// Legacy single-shot mode: embed the question, retrieve the closest
/// chunks, and answer with the context inlined in the system prompt.
async fn retrieval_turn(
    state: &AppState,
    user_id: Uuid,
    message: &str,
) -> Result<Json<JsonValue>, ApiError> {
    if message.trim().is_empty() {
        return Err(Error::InvalidInput("message: must not be empty".into()).into());
    }

    state
        .db
        .chat
        .append(user_id, ChatRole::User, message)
        .await?;

    let query_vec = state.embedder.embed_query(message).await?;
    let results = state
        .db
        .chunks
        .search(
            user_id,
            &query_vec,
            defaults::SEARCH_TOP_K,
            defaults::SIMILARITY_THRESHOLD,
        )
        .await?;

    debug!(
        result_count = results.len(),
        "Retrieved context for chat turn"
    );

    let context = build_context_block(&results);
    let system = retrieval_system_prompt(context.as_deref());

    let history = state
        .db
        .chat
        .recent(user_id, defaults::HISTORY_WINDOW)
        .await?;
    let messages: Vec<CompletionMessage> = history
        .iter()
        .filter(|r| matches!(r.role, ChatRole::User | ChatRole::Assistant))
        .map(|r| CompletionMessage::text(r.role, r.content.clone()))
        .collect();

    let response = state.completion.complete(&system, &messages, &[]).await?;
    let answer = if response.content.trim().is_empty() {
        defaults::FALLBACK_ANSWER.to_string()
    } else {
        response.content
    };

    state
        .db
        .chat
        .append(user_id, ChatRole::Assistant, &answer)
        .await?;

    Ok(Json(json!({
        "message": answer,
        "context": results.iter().map(ContextEntry::from).collect::<Vec<_>>(),
    })))
}

/// GET /api/chat
pub async fn get_chat(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<JsonValue>, ApiError> {
    let messages = state.db.chat.all(caller.user_id).await?;
    Ok(Json(json!({ "messages": messages })))
}

/// DELETE /api/chat
pub async fn delete_chat(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<JsonValue>, ApiError> {
    state.db.chat.clear(caller.user_id).await?;
    Ok(Json(json!({ "success": true })))
}

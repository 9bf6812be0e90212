//! MCP-style JSON endpoints, one per tool scope.
//!
//! Both endpoints speak the same method set (initialize, resources,
//! tools, prompts); the scope picks the tool set, resource URI scheme,
//! and prompt catalog half. Tool names here are bare, unlike the
//! prefixed names the chat model sees.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

use cnote_chat::{ToolScope, ToolSet};
use cnote_core::{Error, NoteStore, ShareStore};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const RESOURCE_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    pub method: String,
    #[serde(default)]
    pub params: JsonValue,
}

/// POST /api/mcp/private
pub async fn private(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<McpRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    dispatch(&state, caller.user_id, ToolScope::Private, req).await
}

/// POST /api/mcp/shared
pub async fn shared(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<McpRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    dispatch(&state, caller.user_id, ToolScope::Shared, req).await
}

async fn dispatch(
    state: &AppState,
    user_id: Uuid,
    scope: ToolScope,
    req: McpRequest,
) -> Result<Json<JsonValue>, ApiError> {
    let tool_set = match scope {
        ToolScope::Private => &state.private_tools,
        ToolScope::Shared => &state.shared_tools,
    };

    let result = match req.method.as_str() {
        "initialize" => initialize(scope),
        "resources/list" => resources_list(state, user_id, scope).await?,
        "resources/read" => resources_read(state, user_id, scope, &req.params).await?,
        "tools/list" => tools_list(tool_set),
        "tools/call" => tools_call(tool_set, user_id, &req.params).await?,
        "prompts/list" => json!({ "prompts": state.prompts.list(scope) }),
        "prompts/get" => prompts_get(state, user_id, scope, &req.params).await?,
        other => {
            return Err(ApiError::BadRequest(format!(
                "method: unknown value '{}'",
                other
            )))
        }
    };

    Ok(Json(result))
}

fn initialize(scope: ToolScope) -> JsonValue {
    let name = match scope {
        ToolScope::Private => "cnote-private",
        ToolScope::Shared => "cnote-shared",
    };
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "resources": true,
            "tools": true,
            "prompts": true,
        },
    })
}

async fn resources_list(
    state: &AppState,
    user_id: Uuid,
    scope: ToolScope,
) -> Result<JsonValue, ApiError> {
    let resources = match scope {
        ToolScope::Private => {
            let notes = state
                .db
                .notes
                .list_recent_owned(user_id, RESOURCE_LIST_LIMIT)
                .await?;
            notes
                .iter()
                .map(|n| {
                    json!({
                        "uri": format!("note://{}", n.id),
                        "name": n.title,
                        "description": format!(
                            "Personal note updated {}",
                            n.updated_at.format("%Y-%m-%d")
                        ),
                        "mimeType": "text/markdown",
                    })
                })
                .collect::<Vec<_>>()
        }
        ToolScope::Shared => {
            let notes = state
                .db
                .shares
                .list_shared(user_id, RESOURCE_LIST_LIMIT)
                .await?;
            notes
                .iter()
                .map(|n| {
                    json!({
                        "uri": format!("shared://{}", n.note_id),
                        "name": n.title,
                        "description": format!(
                            "Shared by {} ({})",
                            n.owner_username, n.permission
                        ),
                        "mimeType": "text/markdown",
                    })
                })
                .collect::<Vec<_>>()
        }
    };

    Ok(json!({ "resources": resources }))
}

async fn resources_read(
    state: &AppState,
    user_id: Uuid,
    scope: ToolScope,
    params: &JsonValue,
) -> Result<JsonValue, ApiError> {
    let uri = params
        .get("uri")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("uri: required argument".to_string()))?;

    let markdown = match scope {
        ToolScope::Private => {
            let id = parse_resource_uri(uri, "note://")?;
            let note = state.db.notes.fetch_owned(user_id, id).await?;
            format!(
                "# {}\n\n{}\n\n---\n*Created: {}*\n*Updated: {}*\n",
                note.title, note.content, note.created_at, note.updated_at
            )
        }
        ToolScope::Shared => {
            let id = parse_resource_uri(uri, "shared://")?;
            let note = state.db.shares.fetch_shared(user_id, id).await?;
            format!(
                "# {}\n\n{}\n\n---\n*Shared by: @{}*\n*Permission: {}*\n*Created: {}*\n*Updated: {}*\n",
                note.title,
                note.content,
                note.owner_username,
                note.permission,
                note.created_at,
                note.updated_at
            )
        }
    };

    Ok(json!({
        "contents": markdown,
        "mimeType": "text/markdown",
    }))
}

fn parse_resource_uri(uri: &str, prefix: &str) -> Result<Uuid, ApiError> {
    let raw = uri
        .strip_prefix(prefix)
        .ok_or_else(|| ApiError::BadRequest(format!("uri: expected {} scheme", prefix)))?;
    raw.parse()
        .map_err(|_| ApiError::BadRequest("uri: malformed note id".to_string()))
}

fn tools_list(tool_set: &Arc<dyn ToolSet>) -> JsonValue {
    json!({ "tools": tool_set.definitions() })
}

async fn tools_call(
    tool_set: &Arc<dyn ToolSet>,
    user_id: Uuid,
    params: &JsonValue,
) -> Result<JsonValue, ApiError> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("name: required argument".to_string()))?;
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    // Failures here surface as 400s: the caller is a program, not a
    // model turn, and malformed calls should be visible immediately.
    let result = tool_set
        .call(user_id, name, &arguments)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(json!({ "result": result }))
}

async fn prompts_get(
    state: &AppState,
    user_id: Uuid,
    scope: ToolScope,
    params: &JsonValue,
) -> Result<JsonValue, ApiError> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("name: required argument".to_string()))?;
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let messages = match state.prompts.get(scope, name, &arguments, user_id).await {
        Ok(messages) => messages,
        Err(Error::NotFound(msg)) => return Err(ApiError::NotFound(msg)),
        Err(e) => return Err(ApiError::BadRequest(e.to_string())),
    };

    Ok(json!({ "messages": messages }))
}

//! Tool sets for the private and shared note surfaces.
//!
//! Each set exposes its tools under bare names; the registry qualifies
//! them with the scope prefix before the model sees them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use cnote_core::{defaults, excerpt, Error, NoteStore, Result, ShareStore, ToolDefinition};

use crate::scope::ToolScope;

/// A scope's collection of callable tools.
#[async_trait]
pub trait ToolSet: Send + Sync {
    /// The scope this set serves.
    fn scope(&self) -> ToolScope;

    /// Definitions under bare (unqualified) names.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Invoke a tool by bare name on behalf of a user.
    async fn call(&self, user_id: Uuid, name: &str, args: &JsonValue) -> Result<JsonValue>;
}

fn str_arg<'a>(args: &'a JsonValue, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{}: required string argument", key)))
}

fn limit_arg(args: &JsonValue, default: i64) -> i64 {
    args.get("limit")
        .and_then(|v| v.as_i64())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

fn uuid_arg(args: &JsonValue, key: &str) -> Result<Uuid> {
    let raw = str_arg(args, key)?;
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{}: must be a UUID", key)))
}

// =============================================================================
// PRIVATE TOOLS
// =============================================================================

/// Tools over the caller's own notes.
pub struct PrivateTools {
    notes: Arc<dyn NoteStore>,
}

impl PrivateTools {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl ToolSet for PrivateTools {
    fn scope(&self) -> ToolScope {
        ToolScope::Private
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "search_notes".to_string(),
                description: "Search personal notes by keyword".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query (keywords or natural language)"
                        },
                        "limit": {
                            "type": "number",
                            "description": "Maximum number of results (default: 5)"
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "get_note".to_string(),
                description: "Get full content of a specific note by ID".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "note_id": {
                            "type": "string",
                            "description": "The ID of the note to retrieve"
                        }
                    },
                    "required": ["note_id"]
                }),
            },
            ToolDefinition {
                name: "list_recent_notes".to_string(),
                description: "List most recently updated notes".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "number",
                            "description": "Number of notes to return (default: 10)"
                        }
                    }
                }),
            },
        ]
    }

    async fn call(&self, user_id: Uuid, name: &str, args: &JsonValue) -> Result<JsonValue> {
        match name {
            "search_notes" => {
                let query = str_arg(args, "query")?;
                let limit = limit_arg(args, defaults::TOOL_SEARCH_LIMIT);
                let results = self.notes.search_owned(user_id, query, limit).await?;
                Ok(json!({ "results": results }))
            }
            "get_note" => {
                let note_id = uuid_arg(args, "note_id")?;
                let note = self.notes.fetch_owned(user_id, note_id).await?;
                Ok(serde_json::to_value(note)?)
            }
            "list_recent_notes" => {
                let limit = limit_arg(args, defaults::LIST_RECENT_LIMIT);
                let notes = self.notes.list_recent_owned(user_id, limit).await?;
                Ok(json!({ "notes": notes }))
            }
            other => Err(Error::NotFound(format!("Unknown tool: {}", other))),
        }
    }
}

// =============================================================================
// SHARED TOOLS
// =============================================================================

/// Tools over notes shared with the caller.
pub struct SharedTools {
    shares: Arc<dyn ShareStore>,
}

impl SharedTools {
    pub fn new(shares: Arc<dyn ShareStore>) -> Self {
        Self { shares }
    }

    fn summary(note: &cnote_core::SharedNote) -> JsonValue {
        json!({
            "id": note.note_id,
            "title": note.title,
            "excerpt": excerpt(&note.content),
            "owner": note.owner_username,
            "permission": note.permission,
            "updated_at": note.updated_at,
        })
    }
}

#[async_trait]
impl ToolSet for SharedTools {
    fn scope(&self) -> ToolScope {
        ToolScope::Shared
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "search_shared_notes".to_string(),
                description: "Search notes shared with you by keyword".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query (keywords)"
                        },
                        "limit": {
                            "type": "number",
                            "description": "Maximum number of results (default: 5)"
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "get_shared_note".to_string(),
                description: "Get full content of a specific shared note by ID".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "note_id": {
                            "type": "string",
                            "description": "The ID of the shared note to retrieve"
                        }
                    },
                    "required": ["note_id"]
                }),
            },
            ToolDefinition {
                name: "list_shared_notes".to_string(),
                description: "List all notes shared with you".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "number",
                            "description": "Number of notes to return (default: 20)"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "list_by_friend".to_string(),
                description: "List notes shared by a specific friend".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "friend_username": {
                            "type": "string",
                            "description": "Username of the friend"
                        }
                    },
                    "required": ["friend_username"]
                }),
            },
        ]
    }

    async fn call(&self, user_id: Uuid, name: &str, args: &JsonValue) -> Result<JsonValue> {
        match name {
            "search_shared_notes" => {
                let query = str_arg(args, "query")?;
                let limit = limit_arg(args, defaults::TOOL_SEARCH_LIMIT);
                let notes = self.shares.search_shared(user_id, query, limit).await?;
                Ok(json!({ "results": notes.iter().map(Self::summary).collect::<Vec<_>>() }))
            }
            "get_shared_note" => {
                let note_id = uuid_arg(args, "note_id")?;
                // Re-validates the share; a revoked share reads as not found.
                let note = self.shares.fetch_shared(user_id, note_id).await?;
                Ok(serde_json::to_value(note)?)
            }
            "list_shared_notes" => {
                let limit = limit_arg(args, defaults::LIST_SHARED_LIMIT);
                let notes = self.shares.list_shared(user_id, limit).await?;
                Ok(json!({ "notes": notes.iter().map(Self::summary).collect::<Vec<_>>() }))
            }
            "list_by_friend" => {
                let friend = str_arg(args, "friend_username")?;
                let notes = self.shares.list_by_friend(user_id, friend).await?;
                Ok(json!({ "notes": notes.iter().map(Self::summary).collect::<Vec<_>>() }))
            }
            other => Err(Error::NotFound(format!("Unknown tool: {}", other))),
        }
    }
}

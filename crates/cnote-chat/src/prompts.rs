//! System prompts and prompt templates.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use cnote_core::{defaults, Error, NoteStore, Result, SearchResult, ShareStore};

use crate::scope::ToolScope;

/// System prompt for the tool-calling chat engine.
pub const CHAT_SYSTEM_PROMPT: &str = "\
You are a helpful AI assistant for a note-taking application.
You have access to the user's personal notes AND notes that have been shared with them by friends.
Use the available tools to search and read notes before answering questions about their content.
Tools prefixed with 'private_' operate on the user's own notes; tools prefixed with 'shared_' operate on notes shared with them.

When answering:
- Be concise and helpful
- Reference specific notes when applicable
- Clearly indicate if information comes from a shared note (e.g., \"According to a note shared by @username...\")
- If you don't have enough information in the notes, say so
- Provide actionable suggestions when appropriate";

/// Format retrieved chunks into a context block for the single-shot
/// retrieval mode. `None` when there are no hits.
pub fn build_context_block(results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let mut context = String::from("Relevant information from notes:\n\n");
    for (i, result) in results.iter().enumerate() {
        let provenance = if result.is_own_note {
            "Your note".to_string()
        } else {
            match &result.owner_username {
                Some(username) => format!("Shared by @{}", username),
                None => "Shared note".to_string(),
            }
        };
        context.push_str(&format!(
            "[{}] {} - \"{}\":\n{}\n\n",
            i + 1,
            provenance,
            result.title,
            result.chunk_text
        ));
    }
    Some(context)
}

/// System prompt for the single-shot retrieval mode, with the retrieved
/// context inlined.
pub fn retrieval_system_prompt(context: Option<&str>) -> String {
    let context_section = match context {
        Some(context) => format!(
            "Here is some context from notes (personal and shared) that might be relevant:\n\n{}",
            context
        ),
        None => "No relevant notes found for this query.".to_string(),
    };

    format!(
        "You are a helpful AI assistant for a note-taking application.
You have access to the user's personal notes AND notes that have been shared with them by friends.
You can help them find information, answer questions, and provide insights based on both their own notes and shared notes.

{}

When answering:
- Be concise and helpful
- Reference specific notes when applicable
- Clearly indicate if information comes from a shared note (e.g., \"According to a note shared by @username...\")
- If you don't have enough information in the notes, say so
- Provide actionable suggestions when appropriate",
        context_section
    )
}

// =============================================================================
// PROMPT TEMPLATES
// =============================================================================

/// Declared argument of a prompt template.
#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// A listed prompt template.
#[derive(Debug, Clone, Serialize)]
pub struct PromptInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgument>,
}

/// One rendered prompt message.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Parameterized prompt templates for both scopes.
///
/// Summarize variants inline the caller's recent notes so the rendered
/// prompt is self-contained; the others produce a single instruction the
/// model follows with tools.
pub struct PromptCatalog {
    notes: Arc<dyn NoteStore>,
    shares: Arc<dyn ShareStore>,
}

impl PromptCatalog {
    pub fn new(notes: Arc<dyn NoteStore>, shares: Arc<dyn ShareStore>) -> Self {
        Self { notes, shares }
    }

    /// Templates available in a scope.
    pub fn list(&self, scope: ToolScope) -> Vec<PromptInfo> {
        match scope {
            ToolScope::Private => vec![
                PromptInfo {
                    name: "summarize_notes",
                    description: "Generate a summary of all notes",
                    arguments: vec![PromptArgument {
                        name: "focus",
                        description: "Optional focus area for the summary",
                        required: false,
                    }],
                },
                PromptInfo {
                    name: "find_related",
                    description: "Find notes related to a specific topic",
                    arguments: vec![PromptArgument {
                        name: "topic",
                        description: "The topic to find related notes for",
                        required: true,
                    }],
                },
            ],
            ToolScope::Shared => vec![
                PromptInfo {
                    name: "summarize_shared",
                    description: "Generate a summary of notes shared with you",
                    arguments: vec![PromptArgument {
                        name: "friend_username",
                        description: "Optional: focus on notes from a specific friend",
                        required: false,
                    }],
                },
                PromptInfo {
                    name: "compare_perspectives",
                    description: "Compare your notes with shared notes on a topic",
                    arguments: vec![PromptArgument {
                        name: "topic",
                        description: "The topic to compare",
                        required: true,
                    }],
                },
            ],
        }
    }

    /// Render a template with its arguments.
    pub async fn get(
        &self,
        scope: ToolScope,
        name: &str,
        args: &JsonValue,
        user_id: Uuid,
    ) -> Result<Vec<PromptMessage>> {
        match (scope, name) {
            (ToolScope::Private, "summarize_notes") => {
                let focus = args
                    .get("focus")
                    .and_then(|v| v.as_str())
                    .unwrap_or("all topics");

                let notes = self.notes.list_recent_owned(user_id, 20).await?;
                let notes_text = notes
                    .iter()
                    .map(|n| format!("## {}\n{}", n.title, n.excerpt))
                    .collect::<Vec<_>>()
                    .join("\n\n");

                Ok(vec![PromptMessage::user(format!(
                    "Please summarize the following notes, focusing on {}:\n\n{}",
                    focus, notes_text
                ))])
            }
            (ToolScope::Private, "find_related") => {
                let topic = required_arg(args, "topic")?;
                Ok(vec![PromptMessage::user(format!(
                    "Search my notes for anything related to: {}",
                    topic
                ))])
            }
            (ToolScope::Shared, "summarize_shared") => {
                let friend = args.get("friend_username").and_then(|v| v.as_str());

                let notes = match friend {
                    Some(friend) => self.shares.list_by_friend(user_id, friend).await?,
                    None => {
                        self.shares
                            .list_shared(user_id, defaults::LIST_SHARED_LIMIT)
                            .await?
                    }
                };
                let notes_text = notes
                    .iter()
                    .map(|n| {
                        format!(
                            "## {} (by @{})\n{}",
                            n.title,
                            n.owner_username,
                            cnote_core::excerpt(&n.content)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n");

                let focus = match friend {
                    Some(friend) => format!("notes shared by @{}", friend),
                    None => "all shared notes".to_string(),
                };

                Ok(vec![PromptMessage::user(format!(
                    "Please summarize the following {}:\n\n{}",
                    focus, notes_text
                ))])
            }
            (ToolScope::Shared, "compare_perspectives") => {
                let topic = required_arg(args, "topic")?;
                Ok(vec![PromptMessage::user(format!(
                    "Compare my notes with notes shared by friends on the topic: {}. \
                     Highlight different perspectives and insights.",
                    topic
                ))])
            }
            (_, other) => Err(Error::NotFound(format!("Unknown prompt: {}", other))),
        }
    }
}

fn required_arg<'a>(args: &'a JsonValue, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{}: required argument", key)))
}

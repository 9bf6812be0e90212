//! Conversation orchestrator: the tool-calling chat loop.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use cnote_core::{
    defaults, ChatHistoryRepository, ChatRole, CompletionBackend, CompletionMessage, Error,
    Result, ToolCallRecord,
};

use crate::prompts::CHAT_SYSTEM_PROMPT;
use crate::registry::ToolRegistry;

/// Configuration for the orchestrator loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How many persisted messages to replay as context.
    pub history_window: i64,
    /// Completion calls allowed per turn.
    pub max_iterations: usize,
    /// System prompt sent with every completion.
    pub system_prompt: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_window: defaults::HISTORY_WINDOW,
            max_iterations: defaults::MAX_TOOL_ITERATIONS,
            system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    /// The assistant's answer.
    pub message: String,
    /// Tool invocations made during the turn, in request order.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Drives one user turn through the completion loop.
///
/// The model may request tool calls on each iteration; requested calls
/// run concurrently and their results are fed back, up to
/// `max_iterations` completions. Hitting the cap is not an error: the
/// turn resolves to the model's last text, or a fixed fallback when it
/// produced none.
pub struct Orchestrator {
    history: Arc<dyn ChatHistoryRepository>,
    completion: Arc<dyn CompletionBackend>,
    registry: ToolRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        history: Arc<dyn ChatHistoryRepository>,
        completion: Arc<dyn CompletionBackend>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            history,
            completion,
            registry,
            config: OrchestratorConfig::default(),
        }
    }

    /// Override the loop configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one user turn to completion.
    pub async fn run_turn(&self, user_id: Uuid, message: &str) -> Result<ChatTurn> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("message: must not be empty".into()));
        }

        // Persist first so the turn is visible in history even if the
        // model call fails.
        self.history
            .append(user_id, ChatRole::User, message)
            .await?;

        let records = self
            .history
            .recent(user_id, self.config.history_window)
            .await?;

        let mut messages: Vec<CompletionMessage> = records
            .iter()
            .filter(|r| matches!(r.role, ChatRole::User | ChatRole::Assistant))
            .map(|r| CompletionMessage::text(r.role, r.content.clone()))
            .collect();

        let tools = self.registry.definitions();
        let mut audit: Vec<ToolCallRecord> = Vec::new();
        let mut last_content = String::new();

        for iteration in 1..=self.config.max_iterations {
            let response = self
                .completion
                .complete(&self.config.system_prompt, &messages, &tools)
                .await?;

            if response.tool_calls.is_empty() {
                let answer = if response.content.trim().is_empty() {
                    defaults::FALLBACK_ANSWER.to_string()
                } else {
                    response.content
                };
                return self.finish(user_id, answer, audit).await;
            }

            debug!(
                iteration,
                tool_count = response.tool_calls.len(),
                "Model requested tool calls"
            );

            last_content = response.content.clone();
            let calls = response.tool_calls;
            messages.push(CompletionMessage::assistant_tool_calls(
                response.content,
                calls.clone(),
            ));

            // All calls of one round run concurrently; results are fed
            // back in request order regardless of completion order.
            let results = join_all(
                calls
                    .iter()
                    .map(|call| self.registry.execute(user_id, call)),
            )
            .await;

            for (call, record) in calls.iter().zip(results) {
                messages.push(CompletionMessage::tool_result(
                    call.id.clone(),
                    record.result.to_string(),
                ));
                audit.push(record);
            }
        }

        info!(
            max_iterations = self.config.max_iterations,
            "Tool loop cap reached, resolving turn"
        );

        let answer = if last_content.trim().is_empty() {
            defaults::FALLBACK_ANSWER.to_string()
        } else {
            last_content
        };
        self.finish(user_id, answer, audit).await
    }

    async fn finish(
        &self,
        user_id: Uuid,
        answer: String,
        audit: Vec<ToolCallRecord>,
    ) -> Result<ChatTurn> {
        self.history
            .append(user_id, ChatRole::Assistant, &answer)
            .await?;

        Ok(ChatTurn {
            message: answer,
            tool_calls: audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ToolScope;
    use crate::tools::ToolSet;
    use async_trait::async_trait;
    use chrono::Utc;
    use cnote_core::{ChatMessageRecord, ToolCallRequest, ToolDefinition};
    use cnote_inference::MockInferenceBackend;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;

    struct InMemoryHistory {
        messages: Mutex<Vec<ChatMessageRecord>>,
    }

    impl InMemoryHistory {
        fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }

        fn roles(&self) -> Vec<ChatRole> {
            self.messages.lock().unwrap().iter().map(|m| m.role).collect()
        }
    }

    #[async_trait]
    impl ChatHistoryRepository for InMemoryHistory {
        async fn append(
            &self,
            user_id: Uuid,
            role: ChatRole,
            content: &str,
        ) -> Result<ChatMessageRecord> {
            let record = ChatMessageRecord {
                id: Uuid::new_v4(),
                user_id,
                role,
                content: content.to_string(),
                created_at: Utc::now(),
            };
            self.messages.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ChatMessageRecord>> {
            let messages = self.messages.lock().unwrap();
            let filtered: Vec<ChatMessageRecord> = messages
                .iter()
                .filter(|m| m.user_id == user_id && m.role != ChatRole::System)
                .cloned()
                .collect();
            let skip = filtered.len().saturating_sub(limit as usize);
            Ok(filtered.into_iter().skip(skip).collect())
        }

        async fn all(&self, user_id: Uuid) -> Result<Vec<ChatMessageRecord>> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn clear(&self, user_id: Uuid) -> Result<()> {
            self.messages.lock().unwrap().retain(|m| m.user_id != user_id);
            Ok(())
        }
    }

    struct ScriptedSet {
        scope: ToolScope,
    }

    #[async_trait]
    impl ToolSet for ScriptedSet {
        fn scope(&self) -> ToolScope {
            self.scope
        }

        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "search_notes".to_string(),
                description: "Search".to_string(),
                parameters: json!({"type": "object"}),
            }]
        }

        async fn call(&self, _user_id: Uuid, name: &str, args: &JsonValue) -> Result<JsonValue> {
            match name {
                "search_notes" => Ok(json!({"results": [], "echo": args})),
                "boom" => Err(Error::Internal("store offline".into())),
                other => Err(Error::NotFound(format!("Unknown tool: {}", other))),
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(
            Arc::new(ScriptedSet {
                scope: ToolScope::Private,
            }),
            Arc::new(ScriptedSet {
                scope: ToolScope::Shared,
            }),
        )
    }

    fn tool_call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments: json!({"query": "kyoto"}),
        }
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let history = Arc::new(InMemoryHistory::new());
        let backend = Arc::new(MockInferenceBackend::new().with_answer_turn("Here you go."));

        let orchestrator = Orchestrator::new(history.clone(), backend.clone(), registry());
        let turn = orchestrator
            .run_turn(Uuid::new_v4(), "what did I write?")
            .await
            .unwrap();

        assert_eq!(turn.message, "Here you go.");
        assert!(turn.tool_calls.is_empty());
        assert_eq!(backend.completion_call_count(), 1);
        assert_eq!(history.roles(), vec![ChatRole::User, ChatRole::Assistant]);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let history = Arc::new(InMemoryHistory::new());
        let backend = Arc::new(
            MockInferenceBackend::new()
                .with_tool_call_turn(vec![tool_call("call_1", "private_search_notes")])
                .with_answer_turn("Found it in your trip notes."),
        );

        let orchestrator = Orchestrator::new(history.clone(), backend.clone(), registry());
        let turn = orchestrator
            .run_turn(Uuid::new_v4(), "where am I going in April?")
            .await
            .unwrap();

        assert_eq!(turn.message, "Found it in your trip notes.");
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].tool, "private_search_notes");
        assert!(!turn.tool_calls[0].is_error);
        assert_eq!(backend.completion_call_count(), 2);
    }

    #[tokio::test]
    async fn test_iteration_cap_resolves_with_fallback() {
        let history = Arc::new(InMemoryHistory::new());
        let mut backend = MockInferenceBackend::new();
        for i in 0..10 {
            backend = backend.with_tool_call_turn(vec![tool_call(
                &format!("call_{}", i),
                "private_search_notes",
            )]);
        }
        let backend = Arc::new(backend);

        let orchestrator = Orchestrator::new(history.clone(), backend.clone(), registry());
        let turn = orchestrator
            .run_turn(Uuid::new_v4(), "loop forever")
            .await
            .unwrap();

        assert_eq!(backend.completion_call_count(), defaults::MAX_TOOL_ITERATIONS);
        assert_eq!(turn.message, defaults::FALLBACK_ANSWER);
        assert_eq!(turn.tool_calls.len(), defaults::MAX_TOOL_ITERATIONS);
        // Turn still ends with a persisted assistant message.
        assert_eq!(
            history.roles().last().copied(),
            Some(ChatRole::Assistant)
        );
    }

    #[tokio::test]
    async fn test_failing_tool_does_not_abort_turn() {
        let history = Arc::new(InMemoryHistory::new());
        let backend = Arc::new(
            MockInferenceBackend::new()
                .with_tool_call_turn(vec![
                    tool_call("call_1", "private_search_notes"),
                    tool_call("call_2", "private_boom"),
                    tool_call("call_3", "shared_search_notes"),
                ])
                .with_answer_turn("Partial results found."),
        );

        let orchestrator = Orchestrator::new(history, backend, registry());
        let turn = orchestrator
            .run_turn(Uuid::new_v4(), "search everywhere")
            .await
            .unwrap();

        assert_eq!(turn.message, "Partial results found.");
        // Request order preserved.
        assert_eq!(turn.tool_calls.len(), 3);
        assert_eq!(turn.tool_calls[0].tool, "private_search_notes");
        assert!(!turn.tool_calls[0].is_error);
        assert_eq!(turn.tool_calls[1].tool, "private_boom");
        assert!(turn.tool_calls[1].is_error);
        assert!(!turn.tool_calls[2].is_error);
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_persisting() {
        let history = Arc::new(InMemoryHistory::new());
        let backend = Arc::new(MockInferenceBackend::new());

        let orchestrator = Orchestrator::new(history.clone(), backend.clone(), registry());
        let err = orchestrator
            .run_turn(Uuid::new_v4(), "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(history.roles().is_empty());
        assert_eq!(backend.completion_call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_window_limits_replay() {
        let history = Arc::new(InMemoryHistory::new());
        let user_id = Uuid::new_v4();
        for i in 0..30 {
            history
                .append(user_id, ChatRole::User, &format!("old {}", i))
                .await
                .unwrap();
        }

        let backend = Arc::new(MockInferenceBackend::new().with_answer_turn("ok"));
        let orchestrator = Orchestrator::new(history, backend.clone(), registry());
        orchestrator.run_turn(user_id, "newest").await.unwrap();

        let calls = backend.calls();
        let complete = calls.iter().find(|c| c.operation == "complete").unwrap();
        // Replayed context ends with the newest message.
        assert_eq!(complete.input, "newest");
    }
}

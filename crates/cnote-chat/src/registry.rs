//! Tool registry: scope-qualified names and per-call dispatch.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use cnote_core::{ToolCallRecord, ToolCallRequest, ToolDefinition};

use crate::scope::ToolScope;
use crate::tools::ToolSet;

/// Registry over both tool scopes.
///
/// The model sees one flat list of qualified names. A call that fails,
/// whether from an unknown name, bad arguments, or the store, becomes an
/// error payload in the tool result; the turn itself never aborts on a
/// tool error.
pub struct ToolRegistry {
    private: Arc<dyn ToolSet>,
    shared: Arc<dyn ToolSet>,
}

impl ToolRegistry {
    pub fn new(private: Arc<dyn ToolSet>, shared: Arc<dyn ToolSet>) -> Self {
        Self { private, shared }
    }

    /// All definitions with scope-qualified names, private first.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = Vec::new();
        for set in [&self.private, &self.shared] {
            let scope = set.scope();
            for mut def in set.definitions() {
                def.name = scope.qualify(&def.name);
                defs.push(def);
            }
        }
        defs
    }

    /// Execute one model-issued tool call.
    pub async fn execute(&self, user_id: Uuid, call: &ToolCallRequest) -> ToolCallRecord {
        let outcome = match ToolScope::resolve(&call.name) {
            Some((scope, bare)) => {
                let set = match scope {
                    ToolScope::Private => &self.private,
                    ToolScope::Shared => &self.shared,
                };
                set.call(user_id, bare, &call.arguments).await
            }
            None => Err(cnote_core::Error::NotFound(format!(
                "Unknown tool: {}",
                call.name
            ))),
        };

        match outcome {
            Ok(result) => {
                debug!(tool = %call.name, "Tool call succeeded");
                ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result,
                    is_error: false,
                }
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolCallRecord {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result: json!({ "error": e.to_string() }),
                    is_error: true,
                }
            }
        }
    }
}

//! # cnote-chat
//!
//! The retrieval-augmented chat engine: tool scopes over the private and
//! shared note surfaces, a registry that exposes them to the model under
//! qualified names, the conversation orchestrator that drives the
//! tool-calling loop, and the prompt templates.

pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod scope;
pub mod tools;

pub use orchestrator::{ChatTurn, Orchestrator, OrchestratorConfig};
pub use prompts::{
    build_context_block, retrieval_system_prompt, PromptArgument, PromptCatalog, PromptInfo,
    PromptMessage, CHAT_SYSTEM_PROMPT,
};
pub use registry::ToolRegistry;
pub use scope::ToolScope;
pub use tools::{PrivateTools, SharedTools, ToolSet};

//! Shared application state.

use std::sync::Arc;

use cnote_chat::{Orchestrator, PrivateTools, PromptCatalog, SharedTools, ToolRegistry, ToolSet};
use cnote_core::{CompletionBackend, EmbeddingBackend, NoteStore, ShareStore};
use cnote_db::Database;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub completion: Arc<dyn CompletionBackend>,
    pub orchestrator: Arc<Orchestrator>,
    pub private_tools: Arc<dyn ToolSet>,
    pub shared_tools: Arc<dyn ToolSet>,
    pub prompts: Arc<PromptCatalog>,
}

impl AppState {
    pub fn new(
        db: Database,
        embedder: Arc<dyn EmbeddingBackend>,
        completion: Arc<dyn CompletionBackend>,
    ) -> Self {
        let notes: Arc<dyn NoteStore> = db.notes.clone();
        let shares: Arc<dyn ShareStore> = db.shares.clone();

        let private_tools: Arc<dyn ToolSet> = Arc::new(PrivateTools::new(notes.clone()));
        let shared_tools: Arc<dyn ToolSet> = Arc::new(SharedTools::new(shares.clone()));

        let registry = ToolRegistry::new(private_tools.clone(), shared_tools.clone());
        let orchestrator = Arc::new(Orchestrator::new(
            db.chat.clone(),
            completion.clone(),
            registry,
        ));
        let prompts = Arc::new(PromptCatalog::new(notes, shares));

        Self {
            db,
            embedder,
            completion,
            orchestrator,
            private_tools,
            shared_tools,
            prompts,
        }
    }
}

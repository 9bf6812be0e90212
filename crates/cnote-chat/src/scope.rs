//! Tool scopes: the private and shared note surfaces.

use serde::{Deserialize, Serialize};

/// Which note surface a tool operates on.
///
/// Scope is carried as data on every definition and dispatch, so adding
/// a scope means adding a variant, not another name convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolScope {
    /// The caller's own notes.
    Private,
    /// Notes shared with the caller by friends.
    Shared,
}

impl ToolScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolScope::Private => "private",
            ToolScope::Shared => "shared",
        }
    }

    /// The name a bare tool is exposed under to the model.
    pub fn qualify(&self, bare_name: &str) -> String {
        format!("{}_{}", self.as_str(), bare_name)
    }

    /// Map an exposed tool name back to its scope and bare name.
    pub fn resolve(exposed: &str) -> Option<(ToolScope, &str)> {
        if let Some(bare) = exposed.strip_prefix("private_") {
            Some((ToolScope::Private, bare))
        } else if let Some(bare) = exposed.strip_prefix("shared_") {
            Some((ToolScope::Shared, bare))
        } else {
            None
        }
    }
}

impl std::fmt::Display for ToolScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

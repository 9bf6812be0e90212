//! HTTP request handlers.

pub mod chat;
pub mod mcp;
pub mod notes;

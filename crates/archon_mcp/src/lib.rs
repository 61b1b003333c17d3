//! MCP tool surface (C12, spec §4.12, §6): a single server advertising
//! `health_check`, `rag_search_knowledge_base`, `find_projects`,
//! `find_tasks`, `manage_project`, `manage_task`, `manage_sprint`, and
//! `reconnect_session` over streamable HTTP, every call wrapped by the
//! session manager.

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod tools;
pub mod transport;

pub use dispatch::McpDispatcher;
pub use error::McpError;
pub use tools::{AppServices, ToolContext, ToolRegistry};
pub use transport::{router, MCP_SESSION_HEADER};

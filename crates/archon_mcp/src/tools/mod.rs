//! The seven MCP tools plus `reconnect_session` (spec §6): each is a
//! thin, RBAC-checked wrapper over `archon_retrieval`/`archon_projects`.

mod health;
mod projects;
mod reconnect;
mod search;
mod sprints;
mod tasks;

mod registry;
pub use registry::ToolRegistry;

use std::sync::Arc;

use archon_projects::{DocumentService, ProjectService, ReportService, SprintService, TaskService};
use archon_rbac::Principal;
use archon_retrieval::RetrievalEngine;
use archon_sessions::SessionManager;
use async_trait::async_trait;
use serde_json::Value;

use crate::error::McpError;
use crate::protocol::ToolDefinition;

/// The backend services a tool call may need. One instance is shared
/// across all tool calls (composition root owns construction).
pub struct AppServices {
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
    pub sprints: Arc<SprintService>,
    pub reports: Arc<ReportService>,
    pub documents: Arc<DocumentService>,
    pub retrieval: Arc<RetrievalEngine>,
    pub sessions: Arc<SessionManager>,
}

/// Per-call context: the authenticated principal plus the shared
/// services. Tools never see the raw HTTP/JWT layer.
pub struct ToolContext {
    pub services: Arc<AppServices>,
    pub principal: Principal,
}

/// Provider token usage incurred while servicing a tool call, if any.
/// Most tools never touch a model and report all-zero usage.
#[derive(Debug, Clone, Default)]
pub struct ToolUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub model: Option<String>,
}

/// A tool's result plus whatever provider usage it incurred producing it.
pub struct ToolOutcome {
    pub value: Value,
    pub usage: ToolUsage,
}

impl From<Value> for ToolOutcome {
    fn from(value: Value) -> Self {
        Self { value, usage: ToolUsage::default() }
    }
}

#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Pulls a required field out of a tool's JSON arguments, converting a
/// missing/malformed field into the same `McpError::invalid_params` shape
/// every tool returns for bad input.
pub fn field<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> Result<T, McpError> {
    let value = args
        .get(name)
        .ok_or_else(|| McpError::invalid_params(format!("missing required field: {name}")))?;
    serde_json::from_value(value.clone()).map_err(|e| McpError::invalid_params(format!("field {name}: {e}")))
}

pub fn optional_field<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> Result<Option<T>, McpError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| McpError::invalid_params(format!("field {name}: {e}"))),
    }
}

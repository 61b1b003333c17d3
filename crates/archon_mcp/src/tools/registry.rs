use std::collections::HashMap;

use serde_json::Value;

use super::health::HealthCheckTool;
use super::projects::{FindProjectsTool, ManageProjectTool};
use super::reconnect::ReconnectSessionTool;
use super::search::RagSearchKnowledgeBaseTool;
use super::sprints::ManageSprintTool;
use super::tasks::{FindTasksTool, ManageTaskTool};
use super::{McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;
use crate::protocol::ToolDefinition;

pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn McpTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut tools: HashMap<&'static str, Box<dyn McpTool>> = HashMap::new();
        let all: Vec<Box<dyn McpTool>> = vec![
            Box::new(HealthCheckTool),
            Box::new(RagSearchKnowledgeBaseTool),
            Box::new(FindProjectsTool),
            Box::new(FindTasksTool),
            Box::new(ManageProjectTool),
            Box::new(ManageTaskTool),
            Box::new(ManageSprintTool),
            Box::new(ReconnectSessionTool),
        ];
        for tool in all {
            tools.insert(tool.name(), tool);
        }
        Self { tools }
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn call_tool(&self, name: &str, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::invalid_params(format!("unknown tool: {name}")))?;
        tool.execute(ctx, args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_advertises_all_eight_tools() {
        let registry = ToolRegistry::new();
        for name in [
            "health_check",
            "rag_search_knowledge_base",
            "find_projects",
            "find_tasks",
            "manage_project",
            "manage_task",
            "manage_sprint",
            "reconnect_session",
        ] {
            assert!(registry.has_tool(name), "missing tool: {name}");
        }
    }
}

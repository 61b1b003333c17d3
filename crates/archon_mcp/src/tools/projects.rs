use archon_db::model::{Project, ProjectType};
use archon_protocol::{ProjectId, SubjectId, WorkflowId};
use async_trait::async_trait;
use serde_json::Value;

use super::{field, optional_field, McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct FindProjectsTool;

#[async_trait]
impl McpTool for FindProjectsTool {
    fn name(&self) -> &'static str {
        "find_projects"
    }

    fn description(&self) -> &'static str {
        "Lists projects, optionally filtered by parent and archive status."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "parent_id": { "type": "string" },
                "include_archived": { "type": "boolean", "default": false },
            },
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let parent_id: Option<ProjectId> = optional_field(&args, "parent_id")?;
        let include_archived: bool = optional_field(&args, "include_archived")?.unwrap_or(false);
        let projects = ctx.services.projects.list(parent_id, include_archived).await?;
        Ok(serde_json::to_value(projects)?.into())
    }
}

pub struct ManageProjectTool;

#[async_trait]
impl McpTool for ManageProjectTool {
    fn name(&self) -> &'static str {
        "manage_project"
    }

    fn description(&self) -> &'static str {
        "Creates, reparents, archives, or unarchives a project."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["create", "reparent", "archive", "unarchive"] },
                "project_id": { "type": "string" },
                "owner": { "type": "string" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "parent_id": { "type": "string" },
                "workflow_id": { "type": "string" },
                "project_type": {
                    "type": "string",
                    "enum": ["software", "marketing", "research", "bug-tracking", "custom"],
                },
            },
            "required": ["action"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let action: String = field(&args, "action")?;
        let projects = &ctx.services.projects;

        match action.as_str() {
            "create" => {
                let owner: SubjectId = field(&args, "owner")?;
                let title: String = field(&args, "title")?;
                let description: String = optional_field(&args, "description")?.unwrap_or_default();
                let parent_id: Option<ProjectId> = optional_field(&args, "parent_id")?;
                let workflow_id: WorkflowId = field(&args, "workflow_id")?;
                let project_type: ProjectType = field(&args, "project_type")?;
                let project: Project = projects
                    .create(&ctx.principal, owner, title, description, parent_id, workflow_id, project_type)
                    .await?;
                Ok(serde_json::to_value(project)?.into())
            }
            "reparent" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                let new_parent: Option<ProjectId> = optional_field(&args, "parent_id")?;
                projects.reparent(&ctx.principal, project_id, new_parent).await?;
                Ok(serde_json::json!({ "project_id": project_id, "reparented": true }).into())
            }
            "archive" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                projects.archive(&ctx.principal, project_id).await?;
                Ok(serde_json::json!({ "project_id": project_id, "archived": true }).into())
            }
            "unarchive" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                projects.unarchive(&ctx.principal, project_id).await?;
                Ok(serde_json::json!({ "project_id": project_id, "archived": false }).into())
            }
            other => Err(McpError::invalid_params(format!("unknown manage_project action: {other}"))),
        }
    }
}

use archon_db::model::Priority;
use archon_protocol::{ProjectId, SubjectId, TaskId};
use async_trait::async_trait;
use serde_json::Value;

use super::{field, optional_field, McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct FindTasksTool;

#[async_trait]
impl McpTool for FindTasksTool {
    fn name(&self) -> &'static str {
        "find_tasks"
    }

    fn description(&self) -> &'static str {
        "Lists tasks belonging to a project."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "project_id": { "type": "string" } },
            "required": ["project_id"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let project_id: ProjectId = field(&args, "project_id")?;
        let tasks = ctx.services.tasks.list(project_id).await?;
        Ok(serde_json::to_value(tasks)?.into())
    }
}

pub struct ManageTaskTool;

#[async_trait]
impl McpTool for ManageTaskTool {
    fn name(&self) -> &'static str {
        "manage_task"
    }

    fn description(&self) -> &'static str {
        "Creates, assigns, transitions, or reorders a task."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["create", "assign", "transition", "reorder"] },
                "project_id": { "type": "string" },
                "task_id": { "type": "string" },
                "workflow_stage_id": { "type": "string" },
                "new_stage": { "type": "string" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "assignee": { "type": "string" },
                "priority": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
                "estimated_hours": { "type": "number" },
                "feature": { "type": "string" },
                "order": { "type": "number" },
                "stage_id": { "type": "string" },
                "before": { "type": "number" },
                "after": { "type": "number" },
            },
            "required": ["action"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let action: String = field(&args, "action")?;
        let tasks = &ctx.services.tasks;

        match action.as_str() {
            "create" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                let workflow_stage_id: uuid::Uuid = field(&args, "workflow_stage_id")?;
                let title: String = field(&args, "title")?;
                let description: String = optional_field(&args, "description")?.unwrap_or_default();
                let assignee: Option<SubjectId> = optional_field(&args, "assignee")?;
                let priority: Priority = optional_field(&args, "priority")?.unwrap_or(Priority::Medium);
                let estimated_hours: Option<f64> = optional_field(&args, "estimated_hours")?;
                let feature: Option<String> = optional_field(&args, "feature")?;
                let order: f64 = optional_field(&args, "order")?.unwrap_or(1024.0);
                let task = tasks
                    .create(
                        &ctx.principal,
                        project_id,
                        workflow_stage_id,
                        title,
                        description,
                        assignee,
                        priority,
                        estimated_hours,
                        feature,
                        order,
                    )
                    .await?;
                Ok(serde_json::to_value(task)?.into())
            }
            "assign" => {
                let task_id: TaskId = field(&args, "task_id")?;
                let assignee: Option<SubjectId> = optional_field(&args, "assignee")?;
                let task = tasks.get(task_id).await?;
                let task = tasks.assign(&ctx.principal, task, assignee).await?;
                Ok(serde_json::to_value(task)?.into())
            }
            "transition" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                let task_id: TaskId = field(&args, "task_id")?;
                let new_stage: uuid::Uuid = field(&args, "new_stage")?;
                tasks.transition(&ctx.principal, project_id, task_id, new_stage).await?;
                Ok(serde_json::json!({ "task_id": task_id, "workflow_stage_id": new_stage }).into())
            }
            "reorder" => {
                let project_id: ProjectId = field(&args, "project_id")?;
                let task_id: TaskId = field(&args, "task_id")?;
                let stage_id: uuid::Uuid = field(&args, "stage_id")?;
                let before: Option<f64> = optional_field(&args, "before")?;
                let after: Option<f64> = optional_field(&args, "after")?;
                let order = tasks.reorder(&ctx.principal, project_id, stage_id, task_id, before, after).await?;
                Ok(serde_json::json!({ "task_id": task_id, "order": order }).into())
            }
            other => Err(McpError::invalid_params(format!("unknown manage_task action: {other}"))),
        }
    }
}

use archon_protocol::{ProjectId, SprintId};
use async_trait::async_trait;
use serde_json::Value;

use super::{field, McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct ManageSprintTool;

#[async_trait]
impl McpTool for ManageSprintTool {
    fn name(&self) -> &'static str {
        "manage_sprint"
    }

    fn description(&self) -> &'static str {
        "Starts, completes, or cancels a sprint."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["start", "complete", "cancel"] },
                "project_id": { "type": "string" },
                "sprint_id": { "type": "string" },
                "done_stage": { "type": "string" },
            },
            "required": ["action", "project_id", "sprint_id"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let action: String = field(&args, "action")?;
        let project_id: ProjectId = field(&args, "project_id")?;
        let sprint_id: SprintId = field(&args, "sprint_id")?;
        let sprints = &ctx.services.sprints;

        match action.as_str() {
            "start" => {
                sprints.start(&ctx.principal, project_id, sprint_id).await?;
                Ok(serde_json::json!({ "sprint_id": sprint_id, "status": "active" }).into())
            }
            "complete" => {
                let done_stage: uuid::Uuid = field(&args, "done_stage")?;
                let velocity = sprints.complete(&ctx.principal, project_id, sprint_id, done_stage).await?;
                Ok(serde_json::json!({ "sprint_id": sprint_id, "status": "completed", "velocity": velocity }).into())
            }
            "cancel" => {
                sprints.cancel(&ctx.principal, project_id, sprint_id).await?;
                Ok(serde_json::json!({ "sprint_id": sprint_id, "status": "cancelled" }).into())
            }
            other => Err(McpError::invalid_params(format!("unknown manage_sprint action: {other}"))),
        }
    }
}

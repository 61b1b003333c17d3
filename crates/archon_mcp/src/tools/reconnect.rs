use archon_protocol::SessionId;
use async_trait::async_trait;
use serde_json::Value;

use super::{field, McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct ReconnectSessionTool;

#[async_trait]
impl McpTool for ReconnectSessionTool {
    fn name(&self) -> &'static str {
        "reconnect_session"
    }

    fn description(&self) -> &'static str {
        "Reattaches to a disconnected session using a previously issued reconnection token."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "reconnect_token": { "type": "string" },
            },
            "required": ["session_id", "reconnect_token"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let session_id: SessionId = field(&args, "session_id")?;
        let token: String = field(&args, "reconnect_token")?;
        let session = ctx.services.sessions.reconnect(session_id, &token).await?;
        Ok(serde_json::to_value(session)?.into())
    }
}

use async_trait::async_trait;
use serde_json::Value;

use super::{McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct HealthCheckTool;

#[async_trait]
impl McpTool for HealthCheckTool {
    fn name(&self) -> &'static str {
        "health_check"
    }

    fn description(&self) -> &'static str {
        "Reports server liveness; the first call a client makes, establishing its session."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    async fn execute(&self, _ctx: &ToolContext, _args: Value) -> Result<ToolOutcome, McpError> {
        Ok(serde_json::json!({
            "status": "ok",
            "server_version": env!("CARGO_PKG_VERSION"),
        })
        .into())
    }
}

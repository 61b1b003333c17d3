use std::collections::BTreeSet;

use archon_db::model::KnowledgeType;
use archon_db::search::SearchFilters;
use async_trait::async_trait;
use serde_json::Value;

use super::{field, optional_field, McpTool, ToolContext, ToolOutcome};
use crate::error::McpError;

pub struct RagSearchKnowledgeBaseTool;

#[async_trait]
impl McpTool for RagSearchKnowledgeBaseTool {
    fn name(&self) -> &'static str {
        "rag_search_knowledge_base"
    }

    fn description(&self) -> &'static str {
        "Hybrid vector/lexical search over the ingested knowledge base, with RRF fusion and optional rerank."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "match_count": { "type": "integer", "minimum": 1, "default": 10 },
                "source_id": { "type": "string" },
                "project_id": { "type": "string" },
                "knowledge_type": { "type": "string", "enum": ["technical", "business"] },
                "tags": { "type": "array", "items": { "type": "string" } },
            },
            "required": ["query"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutcome, McpError> {
        let query: String = field(&args, "query")?;
        let match_count: Option<usize> = optional_field(&args, "match_count")?;
        let source_id = optional_field(&args, "source_id")?;
        let project_id = optional_field(&args, "project_id")?;
        let knowledge_type: Option<KnowledgeType> = optional_field(&args, "knowledge_type")?;
        let tags: Option<Vec<String>> = optional_field(&args, "tags")?;

        let filters = SearchFilters {
            source_id,
            project_id,
            knowledge_type,
            tags: tags.map(BTreeSet::from_iter).unwrap_or_default(),
        };

        let envelope = ctx.services.retrieval.search(&query, filters, match_count.unwrap_or(10)).await?;
        Ok(serde_json::to_value(envelope)?.into())
    }
}

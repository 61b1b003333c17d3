//! A [`ProviderClient`] for OpenAI-compatible HTTP APIs (OpenAI itself,
//! Azure OpenAI, and any self-hosted server implementing the same
//! `/v1/embeddings` and `/v1/chat/completions` shapes). Jina's reranker
//! uses a different endpoint shape and gets its own thin client, sharing
//! this module's `reqwest::Client`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::client::{ChatCompletion, ChatMessage, ChatOptions, ProviderClient, RerankedDoc};
use crate::error::ProviderError;

pub struct OpenAiCompatibleClient {
    name: String,
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    batch_limit: usize,
}

impl OpenAiCompatibleClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            embedding_model: embedding_model.into(),
            batch_limit: 100,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ProviderError::RateLimited(body.to_string())
        } else if status.is_server_error() {
            ProviderError::Unavailable(format!("{status}: {body}"))
        } else {
            ProviderError::Unavailable(format!("{status}: {body}"))
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_batch(&[text.to_string()]).await?.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let resp = self
            .authed(self.http.post(format!("{}/embeddings", self.base_url)))
            .json(&json!({ "model": self.embedding_model, "input": texts }))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }
        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, ProviderError> {
        let resp = self
            .authed(self.http.post(format!("{}/chat/completions", self.base_url)))
            .json(&json!({
                "model": options.model,
                "messages": messages,
                "temperature": options.temperature,
                "max_tokens": options.max_tokens,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Unavailable("empty choices array".to_string()))?;

        Ok(ChatCompletion {
            content: choice.message.content,
            prompt_tokens: parsed.usage.prompt_tokens,
            completion_tokens: parsed.usage.completion_tokens,
            estimated_cost: estimate_cost(&options.model, parsed.usage.prompt_tokens, parsed.usage.completion_tokens),
        })
    }

    async fn rerank(&self, _query: &str, _docs: &[String]) -> Result<Vec<RerankedDoc>, ProviderError> {
        Err(ProviderError::UnsupportedCapability {
            provider: self.name.clone(),
            capability: "rerank",
        })
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

/// Per-model price table loaded at startup (spec §4.8 "Cost is computed
/// from a per-model price table"); a model with no table entry costs
/// nothing rather than panicking.
fn estimate_cost(model: &str, prompt_tokens: i64, completion_tokens: i64) -> f64 {
    let (prompt_per_million, completion_per_million) = match model {
        "gpt-4o" => (2.50, 10.00),
        "gpt-4o-mini" => (0.15, 0.60),
        _ => (0.0, 0.0),
    };
    (prompt_tokens as f64 / 1_000_000.0) * prompt_per_million
        + (completion_tokens as f64 / 1_000_000.0) * completion_per_million
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_cost_is_zero_for_unknown_models() {
        assert_eq!(estimate_cost("some-unlisted-model", 1000, 1000), 0.0);
    }

    #[test]
    fn estimate_cost_scales_with_token_counts() {
        let cost = estimate_cost("gpt-4o-mini", 1_000_000, 1_000_000);
        assert!((cost - 0.75).abs() < 1e-9);
    }
}

//! The capability interface spec §9 asks us to replace string-keyed
//! provider dispatch with: `{embed_one, embed_batch, chat, rerank}`.
//! Unsupported capabilities are absent methods, validated at
//! configuration load via [`crate::gateway::ProviderDescriptor`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankedDoc {
    pub index: usize,
    pub score: f64,
}

/// A client for one configured provider. Not every provider implements
/// every capability; a provider that doesn't support, say, `rerank`
/// returns [`ProviderError::UnsupportedCapability`] rather than the
/// gateway trying to call a nonexistent method.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, ProviderError>;

    async fn rerank(
        &self,
        query: &str,
        docs: &[String],
    ) -> Result<Vec<RerankedDoc>, ProviderError>;

    /// The provider's declared embedding batch limit (default 100, per
    /// spec §4.3).
    fn batch_limit(&self) -> usize {
        100
    }
}

//! The gateway itself: validation, key resolution, retry, and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{ChatCompletion, ChatMessage, ChatOptions, ProviderClient, RerankedDoc};
use crate::error::ProviderError;
use crate::retry::with_retry;

/// Describes one configured provider, matching spec §4.3's
/// `{provider, model, dimension?, base_url?, api_key?}` shape.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub provider: String,
    pub model: String,
    pub dimension: Option<i32>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub supports_embedding: bool,
    pub requires_key: bool,
}

pub struct ProviderGateway {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    descriptors: HashMap<String, ProviderDescriptor>,
    embedding_provider: String,
    chat_provider: String,
    rerank_provider: Option<String>,
}

impl ProviderGateway {
    pub fn new(
        clients: HashMap<String, Arc<dyn ProviderClient>>,
        descriptors: HashMap<String, ProviderDescriptor>,
        embedding_provider: String,
        chat_provider: String,
        rerank_provider: Option<String>,
    ) -> Result<Self, ProviderError> {
        let descriptor = descriptors
            .get(&embedding_provider)
            .ok_or_else(|| ProviderError::UnknownProvider(embedding_provider.clone()))?;
        if !descriptor.supports_embedding {
            return Err(ProviderError::UnsupportedCapability {
                provider: embedding_provider.clone(),
                capability: "embed",
            });
        }
        if descriptor.requires_key && descriptor.api_key.is_none() {
            return Err(ProviderError::MissingApiKey(embedding_provider.clone()));
        }
        if !descriptors.contains_key(&chat_provider) {
            return Err(ProviderError::UnknownProvider(chat_provider.clone()));
        }
        if let Some(rerank) = &rerank_provider {
            if !descriptors.contains_key(rerank) {
                return Err(ProviderError::UnknownProvider(rerank.clone()));
            }
        }

        Ok(Self {
            clients,
            descriptors,
            embedding_provider,
            chat_provider,
            rerank_provider,
        })
    }

    fn client(&self, provider: &str) -> Result<&Arc<dyn ProviderClient>, ProviderError> {
        self.clients
            .get(provider)
            .ok_or_else(|| ProviderError::UnknownProvider(provider.to_string()))
    }

    pub fn embedding_dimension(&self) -> Option<i32> {
        self.descriptors.get(&self.embedding_provider).and_then(|d| d.dimension)
    }

    /// The configured embedding provider's id, used as part of the
    /// embedding cache fingerprint (spec §4.2).
    pub fn embedding_provider_id(&self) -> &str {
        &self.embedding_provider
    }

    /// The configured embedding provider's model name, used as part of
    /// the embedding cache fingerprint and stored alongside each vector.
    pub fn embedding_model(&self) -> &str {
        self.descriptors
            .get(&self.embedding_provider)
            .map(|d| d.model.as_str())
            .unwrap_or(&self.embedding_provider)
    }

    pub fn rerank_configured(&self) -> bool {
        self.rerank_provider.is_some()
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let client = self.client(&self.embedding_provider)?.clone();
        let text = text.to_string();
        with_retry(|| {
            let client = client.clone();
            let text = text.clone();
            async move { client.embed_one(&text).await }
        })
        .await
    }

    /// Batched up to the provider's declared limit (default 100); a
    /// caller asking for more than the limit in one call is a validation
    /// error rather than silently chunked, so ingestion (which does its
    /// own chunk-sized batching) is the one responsible for staying under
    /// the limit.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let client = self.client(&self.embedding_provider)?.clone();
        let limit = client.batch_limit();
        if texts.len() > limit {
            return Err(ProviderError::BatchTooLarge {
                requested: texts.len(),
                limit,
            });
        }
        let texts = texts.to_vec();
        with_retry(|| {
            let client = client.clone();
            let texts = texts.clone();
            async move { client.embed_batch(&texts).await }
        })
        .await
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, ProviderError> {
        let client = self.client(&self.chat_provider)?.clone();
        let messages = messages.to_vec();
        let options = options.clone();
        with_retry(|| {
            let client = client.clone();
            let messages = messages.clone();
            let options = options.clone();
            async move { client.chat(&messages, &options).await }
        })
        .await
    }

    pub async fn rerank(
        &self,
        query: &str,
        docs: &[String],
    ) -> Result<Vec<RerankedDoc>, ProviderError> {
        let provider = self
            .rerank_provider
            .as_ref()
            .ok_or_else(|| ProviderError::UnsupportedCapability {
                provider: "none-configured".to_string(),
                capability: "rerank",
            })?;
        let client = self.client(provider)?.clone();
        let query = query.to_string();
        let docs = docs.to_vec();
        with_retry(|| {
            let client = client.clone();
            let query = query.clone();
            let docs = docs.clone();
            async move { client.rerank(&query, &docs).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubClient;

    #[async_trait]
    impl ProviderClient for StubClient {
        fn name(&self) -> &str {
            "stub"
        }
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![0.1, 0.2])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &ChatOptions,
        ) -> Result<ChatCompletion, ProviderError> {
            Ok(ChatCompletion {
                content: "ok".to_string(),
                prompt_tokens: 1,
                completion_tokens: 1,
                estimated_cost: 0.0,
            })
        }
        async fn rerank(&self, _query: &str, docs: &[String]) -> Result<Vec<RerankedDoc>, ProviderError> {
            Ok(docs
                .iter()
                .enumerate()
                .map(|(i, _)| RerankedDoc { index: i, score: 1.0 })
                .collect())
        }
        fn batch_limit(&self) -> usize {
            2
        }
    }

    fn test_gateway() -> ProviderGateway {
        let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        clients.insert("stub".to_string(), Arc::new(StubClient));
        let mut descriptors = HashMap::new();
        descriptors.insert(
            "stub".to_string(),
            ProviderDescriptor {
                provider: "stub".to_string(),
                model: "stub-model".to_string(),
                dimension: Some(1536),
                base_url: None,
                api_key: Some("key".to_string()),
                supports_embedding: true,
                requires_key: true,
            },
        );
        ProviderGateway::new(
            clients,
            descriptors,
            "stub".to_string(),
            "stub".to_string(),
            Some("stub".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn rejects_embedding_provider_missing_key() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            "stub".to_string(),
            ProviderDescriptor {
                provider: "stub".to_string(),
                model: "m".to_string(),
                dimension: Some(1536),
                base_url: None,
                api_key: None,
                supports_embedding: true,
                requires_key: true,
            },
        );
        let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        clients.insert("stub".to_string(), Arc::new(StubClient));
        let err = ProviderGateway::new(
            clients,
            descriptors,
            "stub".to_string(),
            "stub".to_string(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn embed_batch_over_limit_is_rejected() {
        let gateway = test_gateway();
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = gateway.embed_batch(&texts).await.unwrap_err();
        assert!(matches!(err, ProviderError::BatchTooLarge { .. }));
    }

    #[tokio::test]
    async fn embed_one_dispatches_to_configured_provider() {
        let gateway = test_gateway();
        let v = gateway.embed_one("hello").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2]);
    }
}

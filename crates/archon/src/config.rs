//! Environment-variable configuration (spec §6): storage endpoints,
//! active models, provider credentials, and MCP session secrets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use archon_providers::{ProviderDescriptor, ProviderGateway};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0}={1:?} is not a valid value")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Local,
    Remote,
}

/// Resolved process configuration, read once at startup from the
/// environment (spec §6's "Environment variables" list).
pub struct Config {
    pub mode: Mode,
    pub database_uri: String,
    pub embedding_model: String,
    pub embedding_dimensions: i32,
    pub llm_provider: String,
    pub openai_api_key: Option<String>,
    pub jina_api_key: Option<String>,
    pub mcp_session_secret: String,
    pub mcp_reconnect_token_expiry: Duration,
    pub backup_on_start: bool,
    pub jwt_secret: Option<String>,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env_var("MODE").as_deref() {
            None | Some("local") => Mode::Local,
            Some("remote") => Mode::Remote,
            Some(other) => return Err(ConfigError::Invalid("MODE", other.to_string())),
        };

        let database_uri = env_var("DATABASE_URI")
            .or_else(|| env_var("SUPABASE_URL"))
            .ok_or(ConfigError::Missing("DATABASE_URI or SUPABASE_URL"))?;

        let embedding_model = env_var("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string());
        let embedding_dimensions: i32 = env_var("EMBEDDING_DIMENSIONS")
            .unwrap_or_else(|| "1536".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("EMBEDDING_DIMENSIONS", "not an integer".to_string()))?;
        let llm_provider = env_var("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string());

        let mcp_session_secret = match env_var("MCP_SESSION_SECRET") {
            Some(s) => s,
            None if mode == Mode::Local => {
                tracing::warn!("MCP_SESSION_SECRET not set; generating an ephemeral one for this dev process");
                uuid::Uuid::new_v4().to_string()
            }
            None => return Err(ConfigError::Missing("MCP_SESSION_SECRET")),
        };

        let mcp_reconnect_token_expiry = Duration::from_secs(
            env_var("MCP_RECONNECT_TOKEN_EXPIRY")
                .unwrap_or_else(|| "15".to_string())
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("MCP_RECONNECT_TOKEN_EXPIRY", "not an integer".to_string()))?
                * 60,
        );

        let backup_on_start = env_var("BACKUP_ON_START").map(|v| v == "true").unwrap_or(false);

        // Not named in spec §6; added so `archon_api::AuthLayer` has a
        // secret to verify JWTs against. Unset means dev mode (no auth).
        let jwt_secret = env_var("JWT_SECRET");

        let bind_addr = env_var("ARCHON_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8181".to_string());
        let cors_origins = env_var("ARCHON_CORS_ORIGINS").map(|v| v.split(',').map(str::to_string).collect()).unwrap_or_default();

        Ok(Self {
            mode,
            database_uri,
            embedding_model,
            embedding_dimensions,
            llm_provider,
            openai_api_key: env_var("OPENAI_API_KEY"),
            jina_api_key: env_var("JINA_API_KEY"),
            mcp_session_secret,
            mcp_reconnect_token_expiry,
            backup_on_start,
            jwt_secret,
            bind_addr,
            cors_origins,
        })
    }

    /// Builds the provider gateway from the configured model/credentials.
    /// Only the two providers spec §4.3 names clients for (OpenAI-
    /// compatible embeddings/chat, Jina rerank) are wired; an unknown
    /// `LLM_PROVIDER` still registers under that name against the OpenAI-
    /// compatible base URL so self-hosted-compatible servers work.
    pub fn build_gateway(&self) -> Result<Arc<ProviderGateway>, ConfigError> {
        use archon_providers::ProviderClient;
        use std::sync::Arc as StdArc;

        let mut clients: HashMap<String, StdArc<dyn ProviderClient>> = HashMap::new();
        let mut descriptors = HashMap::new();

        let openai_base = env_var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        clients.insert(
            self.llm_provider.clone(),
            StdArc::new(archon_providers::openai_compatible::OpenAiCompatibleClient::new(
                self.llm_provider.clone(),
                openai_base,
                self.openai_api_key.clone(),
                self.embedding_model.clone(),
            )),
        );
        descriptors.insert(
            self.llm_provider.clone(),
            ProviderDescriptor {
                provider: self.llm_provider.clone(),
                model: self.embedding_model.clone(),
                dimension: Some(self.embedding_dimensions),
                base_url: None,
                api_key: self.openai_api_key.clone(),
                supports_embedding: true,
                requires_key: true,
            },
        );

        let gateway = ProviderGateway::new(clients, descriptors, self.llm_provider.clone(), self.llm_provider.clone(), None)
            .map_err(|e| ConfigError::Invalid("LLM_PROVIDER", e.to_string()))?;
        Ok(Arc::new(gateway))
    }
}

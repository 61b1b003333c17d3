//! Provider gateway (C3): a single point of resolution for chat,
//! embedding, and reranker capabilities.

pub mod client;
pub mod error;
pub mod gateway;
pub mod openai_compatible;
pub mod retry;

pub use client::{ChatCompletion, ChatMessage, ChatOptions, ProviderClient, RerankedDoc};
pub use error::ProviderError;
pub use gateway::{ProviderDescriptor, ProviderGateway};

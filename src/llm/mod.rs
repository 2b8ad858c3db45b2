//! LLM 客户端抽象与实现（OpenAI 兼容 / Mock）、嵌入提供方

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod traits;

pub use embedding::{create_embedder_from_env, EmbeddingProvider, HashEmbedder, OpenAiEmbedder};
pub use mock::ScriptedLlm;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

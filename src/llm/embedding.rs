//! 嵌入提供方：供向量长期记忆使用
//!
//! OpenAiEmbedder 调用 OpenAI 兼容的 /embeddings 端点；HashEmbedder 为无 Key 运行与测试
//! 提供确定性的词袋哈希向量（余弦相似度近似关键词重叠）。

use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::embeddings::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;

/// 可从 sync 上下文调用的嵌入提供方（内部用 block_on 执行 async 调用）
pub trait EmbeddingProvider: Send + Sync {
    /// 将文本编码为向量；失败时返回错误字符串
    fn embed(&self, text: &str) -> Result<Vec<f32>, String>;
}

/// 使用 async-openai 调用 OpenAI 兼容的 embeddings API
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    /// 与 LLM 共用 OPENAI_API_KEY / base_url
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    pub async fn embed_async(&self, text: &str) -> Result<Vec<f32>, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(vec![]);
        }
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| e.to_string())?;
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;
        let vec = response
            .data
            .first()
            .map(|e| e.embedding.clone())
            .unwrap_or_default();
        Ok(vec)
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        let text = text.to_string();
        let this = self.clone();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(this.embed_async(&text))
        })
    }
}

impl Clone for OpenAiEmbedder {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            model: self.model.clone(),
        }
    }
}

/// 确定性词袋哈希嵌入：每个小写词哈希到固定维度上计数
///
/// 两段文本的余弦相似度随共享词汇增加，足以支撑离线检索与测试；不依赖任何外部服务。
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vec = vec![0.0f32; self.dims];
        let mut any = false;
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.len() < 2 {
                continue;
            }
            let mut h = DefaultHasher::new();
            word.hash(&mut h);
            vec[(h.finish() as usize) % self.dims] += 1.0;
            any = true;
        }
        if !any {
            return Ok(vec![]);
        }
        Ok(vec)
    }
}

/// 选择嵌入提供方：有 OPENAI_API_KEY 时走 embeddings API，否则用本地哈希嵌入
pub fn create_embedder_from_env(
    base_url: Option<&str>,
    model: &str,
) -> Arc<dyn EmbeddingProvider> {
    let key = std::env::var("OPENAI_API_KEY").ok();
    if key.as_deref().unwrap_or("").is_empty() {
        tracing::debug!("no OPENAI_API_KEY, using hash embedder");
        return Arc::new(HashEmbedder::default());
    }
    Arc::new(OpenAiEmbedder::new(base_url, model, key.as_deref()))
}

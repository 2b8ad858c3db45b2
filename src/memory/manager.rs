//! 记忆子系统：短期缓冲 + 长期检索 + 知识库
//!
//! 短期记忆是进程内按用户的有界缓冲；长期记忆是按 user_id 元数据隔离的向量存储；
//! 知识库是无用户归属的共享语料，构造时幂等种子化。
//! 检索失败一律按「无数据」处理（记日志、返回空），绝不向调用方抛错——存储是软依赖。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::memory::knowledge::{PLANT_CORPUS, PLANT_KEYWORDS};
use crate::memory::{ConversationBuffer, Message, VectorStore};

/// 长期记忆记录的元数据键（按用户隔离）
const USER_KEY: &str = "user_id";

/// 记忆管理器：每用户短期缓冲 + 用户隔离长期存储 + 共享知识库
pub struct MemoryManager {
    short_term: RwLock<HashMap<String, ConversationBuffer>>,
    long_term: Arc<dyn VectorStore>,
    knowledge: Arc<dyn VectorStore>,
    max_turns: usize,
}

impl MemoryManager {
    /// 创建管理器并种子化知识库（幂等：已有条目时跳过）
    pub fn new(
        long_term: Arc<dyn VectorStore>,
        knowledge: Arc<dyn VectorStore>,
        max_turns: usize,
    ) -> Self {
        let manager = Self {
            short_term: RwLock::new(HashMap::new()),
            long_term,
            knowledge,
            max_turns,
        };
        manager.seed_knowledge();
        manager
    }

    /// 将固定植物语料写入知识库；已有记录时跳过（重复初始化不产生重复条目）
    fn seed_knowledge(&self) {
        match self.knowledge.get_all(None) {
            Ok(existing) if !existing.is_empty() => {
                tracing::info!(count = existing.len(), "knowledge corpus already seeded");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "knowledge corpus check failed, skipping seed");
                return;
            }
        }
        let mut seeded = 0;
        for entry in PLANT_CORPUS {
            let meta = HashMap::from([("plant_name".to_string(), entry.name.to_string())]);
            match self
                .knowledge
                .upsert(&entry.document_id(), &entry.to_document(), meta)
            {
                Ok(()) => seeded += 1,
                Err(e) => tracing::warn!(plant = entry.name, error = %e, "seed failed"),
            }
        }
        tracing::info!(count = seeded, "knowledge corpus seeded");
    }

    /// 用户的短期历史（按时间顺序，最多最近 K 轮；未知用户返回空）
    pub async fn short_term(&self, user_id: &str) -> Vec<Message> {
        self.short_term
            .read()
            .await
            .get(user_id)
            .map(|buf| buf.messages().to_vec())
            .unwrap_or_default()
    }

    /// 追加一轮到短期缓冲（首轮访问时惰性建缓冲）
    pub async fn append_short_term(&self, user_id: &str, user_text: &str, agent_text: &str) {
        let mut buffers = self.short_term.write().await;
        buffers
            .entry(user_id.to_string())
            .or_insert_with(|| ConversationBuffer::new(self.max_turns))
            .push_turn(user_text, agent_text);
    }

    /// 将一轮对话写入长期记忆，id 采用 "{user}_{uuid}"，并发写入不会互相覆盖
    pub fn add_long_term(&self, user_id: &str, user_text: &str, agent_text: &str) {
        let text = format!("User: {}\nAssistant: {}", user_text, agent_text);
        let id = format!("{}_{}", user_id, Uuid::new_v4());
        let meta = HashMap::from([(USER_KEY.to_string(), user_id.to_string())]);
        if let Err(e) = self.long_term.upsert(&id, &text, meta) {
            tracing::warn!(user = user_id, error = %e, "long-term write failed");
        }
    }

    /// 检索该用户最相关的过往对话，拼为空行分隔的文本；无结果或检索失败返回空串
    pub fn query_long_term(&self, user_id: &str, query: &str, top_n: usize) -> String {
        match self.long_term.query(query, Some((USER_KEY, user_id)), top_n) {
            Ok(hits) => hits
                .iter()
                .map(|h| h.record.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                tracing::warn!(user = user_id, error = %e, "long-term query failed");
                String::new()
            }
        }
    }

    /// 检索共享知识库（无用户过滤），语义同 query_long_term
    pub fn query_knowledge(&self, query: &str, top_n: usize) -> String {
        match self.knowledge.query(query, None, top_n) {
            Ok(hits) => hits
                .iter()
                .map(|h| h.record.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                tracing::warn!(error = %e, "knowledge query failed");
                String::new()
            }
        }
    }

    /// 从该用户的长期记忆文本中提取提到过的植物（关键词匹配，近似而非权威）
    pub fn known_plants(&self, user_id: &str) -> Vec<String> {
        let records = match self.long_term.get_all(Some((USER_KEY, user_id))) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(user = user_id, error = %e, "plant scan failed");
                return Vec::new();
            }
        };
        let mut plants = BTreeSet::new();
        for record in &records {
            let lower = record.text.to_lowercase();
            for keyword in PLANT_KEYWORDS {
                if lower.contains(keyword) {
                    let mut name = keyword.to_string();
                    name[..1].make_ascii_uppercase();
                    plants.insert(name);
                }
            }
        }
        plants.into_iter().collect()
    }

    /// 所有出现过的用户（短期缓冲 ∪ 长期记忆元数据）
    pub async fn user_ids(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> =
            self.short_term.read().await.keys().cloned().collect();
        if let Ok(records) = self.long_term.get_all(None) {
            for record in records {
                if let Some(user) = record.metadata.get(USER_KEY) {
                    ids.insert(user.clone());
                }
            }
        }
        ids.into_iter().collect()
    }

    /// 清除该用户的全部记忆：先摘掉短期缓冲，再删长期记录。
    /// 同一用户的并发轮次由编排器的会话锁挡在外面，因此后续读取要么看到全量、要么看到空。
    pub async fn clear_user(&self, user_id: &str) {
        self.short_term.write().await.remove(user_id);
        match self.long_term.get_all(Some((USER_KEY, user_id))) {
            Ok(records) => {
                let ids: Vec<String> = records.into_iter().map(|r| r.id).collect();
                if !ids.is_empty() {
                    if let Err(e) = self.long_term.delete_by_ids(&ids) {
                        tracing::warn!(user = user_id, error = %e, "long-term delete failed");
                    }
                }
            }
            Err(e) => tracing::warn!(user = user_id, error = %e, "long-term scan failed"),
        }
        tracing::info!(user = user_id, "memory cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashEmbedder;
    use crate::memory::EmbeddingVectorStore;

    fn manager() -> MemoryManager {
        let embedder = Arc::new(HashEmbedder::default());
        MemoryManager::new(
            Arc::new(EmbeddingVectorStore::new(embedder.clone(), 1000)),
            Arc::new(EmbeddingVectorStore::new(embedder, 1000)),
            10,
        )
    }

    #[tokio::test]
    async fn test_short_term_bound() {
        let m = manager();
        for i in 0..15 {
            m.append_short_term("u1", &format!("q{}", i), &format!("a{}", i)).await;
        }
        let history = m.short_term("u1").await;
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "q5");
    }

    #[tokio::test]
    async fn test_short_term_unknown_user_empty() {
        let m = manager();
        assert!(m.short_term("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_long_term_isolation() {
        let m = manager();
        m.add_long_term("u1", "I grow tomatoes", "Great choice");
        m.add_long_term("u2", "I grow roses", "Lovely");

        let u1_context = m.query_long_term("u1", "my plants tomatoes roses", 3);
        assert!(u1_context.contains("tomatoes"));
        assert!(!u1_context.contains("roses"));

        let u2_context = m.query_long_term("u2", "my plants tomatoes roses", 3);
        assert!(u2_context.contains("roses"));
        assert!(!u2_context.contains("tomatoes"));
    }

    #[tokio::test]
    async fn test_knowledge_seed_idempotent() {
        let embedder = Arc::new(HashEmbedder::default());
        let knowledge: Arc<dyn VectorStore> =
            Arc::new(EmbeddingVectorStore::new(embedder.clone(), 1000));
        let _m1 = MemoryManager::new(
            Arc::new(EmbeddingVectorStore::new(embedder.clone(), 1000)),
            knowledge.clone(),
            10,
        );
        let first = knowledge.get_all(None).unwrap().len();
        let _m2 = MemoryManager::new(
            Arc::new(EmbeddingVectorStore::new(embedder, 1000)),
            knowledge.clone(),
            10,
        );
        assert_eq!(knowledge.get_all(None).unwrap().len(), first);
        assert_eq!(first, 5);
    }

    #[tokio::test]
    async fn test_knowledge_query_finds_plant() {
        let m = manager();
        let hits = m.query_knowledge("how often to water tomato", 2);
        assert!(hits.contains("Tomato"));
    }

    #[tokio::test]
    async fn test_known_plants_extraction() {
        let m = manager();
        m.add_long_term("u1", "my tomato and basil are thriving", "Nice");
        let plants = m.known_plants("u1");
        assert!(plants.contains(&"Tomato".to_string()));
        assert!(plants.contains(&"Basil".to_string()));
        assert!(!plants.contains(&"Rose".to_string()));
    }

    #[tokio::test]
    async fn test_clear_user_removes_both_tiers() {
        let m = manager();
        m.append_short_term("u1", "hello", "hi").await;
        m.add_long_term("u1", "I grow mint", "Noted");
        m.clear_user("u1").await;
        assert!(m.short_term("u1").await.is_empty());
        assert!(m.query_long_term("u1", "mint", 3).is_empty());
    }

    #[tokio::test]
    async fn test_user_ids_union() {
        let m = manager();
        m.append_short_term("u1", "hello", "hi").await;
        m.add_long_term("u2", "I grow mint", "Noted");
        let ids = m.user_ids().await;
        assert_eq!(ids, vec!["u1".to_string(), "u2".to_string()]);
    }
}

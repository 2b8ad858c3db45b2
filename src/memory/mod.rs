//! 记忆层：短期（按用户的对话缓冲）、长期（向量检索）、知识库（共享语料）

pub mod conversation;
pub mod knowledge;
pub mod manager;
pub mod vector;

pub use conversation::{ConversationBuffer, Message, Role};
pub use manager::MemoryManager;
pub use vector::{EmbeddingVectorStore, ScoredRecord, StoredRecord, VectorStore};

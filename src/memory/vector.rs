//! 向量存储：相似度检索 + 元数据过滤
//!
//! VectorStore 是长期记忆与知识库共用的存储能力：upsert / query / get_all / delete_by_ids，
//! 按任意元数据键做等值过滤（长期记忆用 user_id 做按用户隔离）。
//! EmbeddingVectorStore 用 EmbeddingProvider 向量化 + 余弦排序，可选 JSON 快照落盘，
//! 进程重启后记录仍在。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::llm::EmbeddingProvider;
use std::sync::Arc;

/// 存储记录（查询与遍历共用的视图）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// 查询命中：记录 + 相似度分数
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: StoredRecord,
    pub score: f32,
}

/// 相似度存储 trait：支持写入、按文本检索（可带元数据过滤）、遍历与批量删除
pub trait VectorStore: Send + Sync {
    /// 存入/覆盖一条记录
    fn upsert(
        &self,
        id: &str,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), String>;

    /// 按查询文本检索 top_n 条；filter 为 (元数据键, 值) 等值过滤
    fn query(
        &self,
        text: &str,
        filter: Option<(&str, &str)>,
        top_n: usize,
    ) -> Result<Vec<ScoredRecord>, String>;

    /// 遍历（可带过滤），返回记录视图（无分数）
    fn get_all(&self, filter: Option<(&str, &str)>) -> Result<Vec<StoredRecord>, String>;

    /// 按 id 批量删除
    fn delete_by_ids(&self, ids: &[String]) -> Result<(), String>;
}

/// 快照文件格式：记录 + 嵌入向量（避免重启后重新向量化）
#[derive(Serialize, Deserialize)]
struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    record: StoredRecord,
    embedding: Vec<f32>,
}

/// 嵌入向量存储：内存条目 + 可选 JSON 快照
pub struct EmbeddingVectorStore {
    entries: RwLock<Vec<(StoredRecord, Vec<f32>)>>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_entries: usize,
    snapshot_path: Option<PathBuf>,
}

impl EmbeddingVectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder,
            max_entries,
            snapshot_path: None,
        }
    }

    /// 带快照文件的存储：构造时加载已有快照（损坏或缺失时从空开始）
    pub fn with_snapshot(
        embedder: Arc<dyn EmbeddingProvider>,
        max_entries: usize,
        path: PathBuf,
    ) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Snapshot>(&data) {
                Ok(snap) => snap
                    .entries
                    .into_iter()
                    .map(|e| (e.record, e.embedding))
                    .collect(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "snapshot corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            entries: RwLock::new(entries),
            embedder,
            max_entries,
            snapshot_path: Some(path),
        }
    }

    /// 将当前条目写入快照文件；失败只记日志（存储是软依赖）
    fn persist(&self, entries: &[(StoredRecord, Vec<f32>)]) {
        let Some(ref path) = self.snapshot_path else {
            return;
        };
        let snap = Snapshot {
            entries: entries
                .iter()
                .map(|(record, embedding)| SnapshotEntry {
                    record: record.clone(),
                    embedding: embedding.clone(),
                })
                .collect(),
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(&snap) {
            Ok(data) => {
                if let Err(e) = std::fs::write(path, data) {
                    tracing::warn!(path = %path.display(), error = %e, "snapshot write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "snapshot serialize failed"),
        }
    }
}

fn matches_filter(record: &StoredRecord, filter: Option<(&str, &str)>) -> bool {
    match filter {
        Some((key, value)) => record.metadata.get(key).map(String::as_str) == Some(value),
        None => true,
    }
}

/// 余弦相似度
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorStore for EmbeddingVectorStore {
    fn upsert(
        &self,
        id: &str,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), String> {
        let embedding = self.embedder.embed(text)?;
        if embedding.is_empty() {
            return Err("Empty embedding".to_string());
        }
        let record = StoredRecord {
            id: id.to_string(),
            text: text.to_string(),
            metadata,
        };
        let mut entries = self.entries.write().unwrap();
        if let Some(existing) = entries.iter_mut().find(|(r, _)| r.id == id) {
            *existing = (record, embedding);
        } else {
            entries.push((record, embedding));
        }
        let n = entries.len();
        if n > self.max_entries {
            entries.drain(0..n - self.max_entries);
        }
        self.persist(&entries);
        Ok(())
    }

    fn query(
        &self,
        text: &str,
        filter: Option<(&str, &str)>,
        top_n: usize,
    ) -> Result<Vec<ScoredRecord>, String> {
        let query_embedding = self.embedder.embed(text)?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }
        let entries = self.entries.read().unwrap();
        let mut scored: Vec<ScoredRecord> = entries
            .iter()
            .filter(|(record, _)| matches_filter(record, filter))
            .map(|(record, embedding)| ScoredRecord {
                record: record.clone(),
                score: cosine_similarity(&query_embedding, embedding),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);
        Ok(scored)
    }

    fn get_all(&self, filter: Option<(&str, &str)>) -> Result<Vec<StoredRecord>, String> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|(record, _)| matches_filter(record, filter))
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn delete_by_ids(&self, ids: &[String]) -> Result<(), String> {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|(record, _)| !ids.contains(&record.id));
        self.persist(&entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashEmbedder;

    fn meta(user: &str) -> HashMap<String, String> {
        HashMap::from([("user_id".to_string(), user.to_string())])
    }

    fn store() -> EmbeddingVectorStore {
        EmbeddingVectorStore::new(Arc::new(HashEmbedder::default()), 100)
    }

    #[test]
    fn test_query_respects_metadata_filter() {
        let s = store();
        s.upsert("a1", "User: I grow tomatoes", meta("u1")).unwrap();
        s.upsert("b1", "User: I grow roses", meta("u2")).unwrap();

        let hits = s.query("tomatoes roses", Some(("user_id", "u1")), 5).unwrap();
        assert!(hits.iter().all(|h| h.record.metadata["user_id"] == "u1"));
    }

    #[test]
    fn test_upsert_overwrites_same_id() {
        let s = store();
        s.upsert("a1", "old text here", meta("u1")).unwrap();
        s.upsert("a1", "new text here", meta("u1")).unwrap();
        let all = s.get_all(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "new text here");
    }

    #[test]
    fn test_delete_by_ids() {
        let s = store();
        s.upsert("a1", "tomato watering notes", meta("u1")).unwrap();
        s.upsert("a2", "rose pruning notes", meta("u1")).unwrap();
        s.delete_by_ids(&["a1".to_string()]).unwrap();
        let all = s.get_all(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a2");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");
        {
            let s = EmbeddingVectorStore::with_snapshot(
                Arc::new(HashEmbedder::default()),
                100,
                path.clone(),
            );
            s.upsert("a1", "basil likes daily water", meta("u1")).unwrap();
        }
        let s = EmbeddingVectorStore::with_snapshot(
            Arc::new(HashEmbedder::default()),
            100,
            path,
        );
        let all = s.get_all(Some(("user_id", "u1"))).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "basil likes daily water");
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");
        std::fs::write(&path, "not json {{{").unwrap();
        let s = EmbeddingVectorStore::with_snapshot(
            Arc::new(HashEmbedder::default()),
            100,
            path,
        );
        assert!(s.get_all(None).unwrap().is_empty());
    }
}

//! Reminder 工具：浇水提醒的持久化
//!
//! 提醒按用户键存进单个 JSON 文件；写入走读-改-写并由单把写锁串行化，
//! 不同用户的并发写不会互相覆盖。加载时文件损坏重置为空集合而不是启动失败。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::tools::ToolOutcome;

/// 单条提醒。active 目前不会被翻转，字段保留给后续的停用操作。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub schedule: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

type ReminderMap = HashMap<String, Vec<Reminder>>;

/// 持久化提醒集合：单文件 JSON + 单写锁
pub struct ReminderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReminderStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// 读全量集合；文件缺失返回空，内容损坏时告警并重置为空
    fn load(&self) -> ReminderMap {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "reminder file corrupt, resetting");
                    ReminderMap::new()
                }
            },
            Err(_) => ReminderMap::new(),
        }
    }

    fn save(&self, map: &ReminderMap) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let data = serde_json::to_string_pretty(map).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, data).map_err(|e| e.to_string())
    }

    /// 追加一条提醒（读-改-写，持锁期间串行）
    pub async fn add(&self, user_id: &str, schedule: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load();
        map.entry(user_id.to_string()).or_default().push(Reminder {
            schedule: schedule.trim().to_string(),
            created_at: Utc::now(),
            active: true,
        });
        self.save(&map)
    }

    /// 该用户的全部提醒；存储失败返回空
    pub async fn list(&self, user_id: &str) -> Vec<Reminder> {
        self.load().get(user_id).cloned().unwrap_or_default()
    }

    /// 删除该用户的全部提醒
    pub async fn clear(&self, user_id: &str) {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load();
        if map.remove(user_id).is_some() {
            if let Err(e) = self.save(&map) {
                tracing::warn!(user = user_id, error = %e, "reminder clear failed");
            }
        }
    }
}

/// 执行 reminder 工具：需要用户键；成功返回确认语，存储失败折叠为描述字符串
pub async fn run(store: &ReminderStore, schedule: &str, user_id: &str) -> ToolOutcome {
    if user_id.trim().is_empty() {
        return ToolOutcome::Failure("User ID required for reminders".to_string());
    }
    let schedule = schedule.trim();
    match store.add(user_id, schedule).await {
        Ok(()) => ToolOutcome::Success(format!("Reminder set: {}", schedule)),
        Err(e) => {
            tracing::warn!(user = user_id, error = %e, "reminder write failed");
            ToolOutcome::Failure(format!("Failed to set reminder: {}", e))
        }
    }
}

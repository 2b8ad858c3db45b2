//! 脚本化 LLM 客户端（用于测试，无需 API）
//!
//! 按入队顺序返回预设回复，队列耗尽后回显最后一条 User 消息，便于离线跑通整轮编排。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// 脚本化客户端：每次 complete 弹出一条预设结果（Ok 或 Err）
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队一条成功回复
    pub fn push(&self, reply: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.into()));
    }

    /// 入队一条失败（模拟上游不可用）
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(reason.into()));
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Answer: {}", last_user))
    }
}

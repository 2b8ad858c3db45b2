//! 短期记忆：按用户的对话缓冲
//!
//! 保留最近 K 轮对话（user/assistant 对，即最多 2K 条消息），超出时从最旧处剪枝（FIFO），
//! 供 LLM 上下文拼接使用。进程内状态，不落盘。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 单个用户的对话缓冲：最近 K 轮（每轮 user + assistant，故实际保留 max_turns*2 条消息）
#[derive(Clone, Debug)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationBuffer {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 追加一轮（用户消息 + 助手回复），随后剪枝
    pub fn push_turn(&mut self, user_text: &str, agent_text: &str) {
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(agent_text));
        self.prune();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 超出 max_turns*2 时丢弃最旧的消息，保留最近部分
    fn prune(&mut self) {
        if self.messages.len() > self.max_turns * 2 {
            let keep = self.max_turns * 2;
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_turn_appends_pairs() {
        let mut buf = ConversationBuffer::new(10);
        buf.push_turn("hi", "hello");
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.messages()[0].role, Role::User);
        assert_eq!(buf.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let mut buf = ConversationBuffer::new(2);
        for i in 0..5 {
            buf.push_turn(&format!("q{}", i), &format!("a{}", i));
        }
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.messages()[0].content, "q3");
        assert_eq!(buf.messages()[3].content, "a4");
    }
}

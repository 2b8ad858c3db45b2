//! 园艺顾问 Agent：单轮处理的状态机
//!
//! 一轮的完整路径：取记忆（短期历史 + 长期相关上下文）→ 规划（仅用于日志）→
//! 拼消息序列 → 首次生成 → 解析 Action 行并可选执行工具 → 二次生成 →
//! 反思 → 提取干净回答 → 双层记忆提交 → 返回。
//! 1-8 步任何未被吸收的失败都在顶层折叠为固定道歉语，且该轮不写入记忆。
//! 同一用户的并发轮次由按用户的会话锁串行；不同用户互不争用。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::memory::{MemoryManager, Message};
use crate::planner::Planner;
use crate::reflection::Reflector;
use crate::tools::ToolDispatcher;

/// 顶层失败时返回给用户的固定文案
pub const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

/// 首次生成结果中标记工具调用的行前缀
const ACTION_MARKER: &str = "Action:";
/// 反思结果中标记最终回答的前缀
const ANSWER_MARKER: &str = "Answer:";

/// 检索参数（长期记忆与知识库的 top-N）
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub long_term_top_n: usize,
    pub knowledge_top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            long_term_top_n: 3,
            knowledge_top_n: 2,
        }
    }
}

/// 园艺顾问 Agent：组合 LLM、记忆、工具、规划与反思
pub struct GardenAgent {
    llm: Arc<dyn LlmClient>,
    memory: Arc<MemoryManager>,
    tools: ToolDispatcher,
    planner: Planner,
    reflector: Reflector,
    retrieval: RetrievalConfig,
    /// user_id -> 会话锁；同一用户的轮次串行，不同用户各持各的锁
    sessions: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// ReAct 风格的 system prompt：工具清单 + 期望的回复形状
fn system_prompt() -> String {
    format!(
        "You are a Smart Garden Advisor Agent helping users with plant care.\n\n\
         You use the ReAct (Reasoning + Acting) framework:\n\
         1. Thought: Think about what you need to do\n\
         2. Action: Choose a tool to use (if needed)\n\
         3. Observation: Analyze the tool result\n\
         4. Answer: Provide final response\n\n\
         Available Tools:\n{}\n\n\
         Guidelines:\n\
         - Always think step-by-step\n\
         - Use tools when you need specific information (weather, calculations, plant knowledge)\n\
         - Be friendly and helpful\n\
         - If you make a mistake, acknowledge and correct it\n\
         - Remember user's previous conversations and their plants\n\n\
         Format your response as:\n\
         Thought: [your reasoning]\n\
         Action: [tool_name: parameters] (if needed)\n\
         Observation: [result analysis]\n\
         Answer: [final response to user]",
        ToolDispatcher::descriptions()
    )
}

/// 从首次生成结果中提取 Action 行：找到以 Action: 开头的行，
/// 在标记后的首个 ':' 处切成 (工具名, 参数)。参数本身可以再含 ':'。
/// 无标记或切分失败都视为无工具调用。
fn extract_action(response: &str) -> Option<(String, String)> {
    let action_line = response
        .lines()
        .find(|line| line.trim_start().starts_with(ACTION_MARKER))?;
    let content = action_line
        .trim_start()
        .strip_prefix(ACTION_MARKER)?
        .trim();
    let (tool, params) = content.split_once(':')?;
    let tool = tool.trim();
    if tool.is_empty() {
        return None;
    }
    Some((tool.to_string(), params.trim().to_string()))
}

/// 从反思结果中提取用户可见回答：有 Answer: 标记取其后文本，否则取全文
fn extract_answer(text: &str) -> String {
    match text.find(ANSWER_MARKER) {
        Some(pos) => text[pos + ANSWER_MARKER.len()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

impl GardenAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        memory: Arc<MemoryManager>,
        tools: ToolDispatcher,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            planner: Planner::new(llm.clone()),
            reflector: Reflector::new(llm.clone()),
            llm,
            memory,
            tools,
            retrieval,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 取（或惰性创建）该用户的会话锁
    async fn session_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 处理一条用户消息；任何内部失败折叠为固定道歉语，该轮不写记忆
    pub async fn process_message(&self, user_id: &str, text: &str) -> String {
        let lock = self.session_lock(user_id).await;
        let _guard = lock.lock().await;

        tracing::info!(user = user_id, preview = %text.chars().take(100).collect::<String>(), "processing message");

        match self.run_turn(user_id, text).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(user = user_id, error = %e, "turn failed");
                APOLOGY.to_string()
            }
        }
    }

    /// 单轮主体：1-8 步全部成功后才进入记忆提交
    async fn run_turn(&self, user_id: &str, text: &str) -> Result<String, AgentError> {
        // 1. 记忆：短期历史 + 以原始消息文本为相似度查询的长期上下文
        let history = self.memory.short_term(user_id).await;
        let relevant = self
            .memory
            .query_long_term(user_id, text, self.retrieval.long_term_top_n);
        let knowledge = self
            .memory
            .query_knowledge(text, self.retrieval.knowledge_top_n);

        // 2. 规划：只进日志与遥测，不改变控制流
        let plan = self.planner.create_plan(text, &relevant).await;
        tracing::info!(
            user = user_id,
            kind = ?plan.kind,
            requires_tools = plan.requires_tools,
            steps = plan.steps.len(),
            "plan created"
        );

        // 3. 拼消息序列：system + 可选上下文块 + 按时间序的短期历史 + 新消息
        let mut messages = vec![Message::system(system_prompt())];
        let mut context_block = String::new();
        if !relevant.is_empty() {
            context_block.push_str("Relevant context from past conversations:\n");
            context_block.push_str(&relevant);
        }
        if !knowledge.is_empty() {
            if !context_block.is_empty() {
                context_block.push_str("\n\n");
            }
            context_block.push_str("Plant care knowledge:\n");
            context_block.push_str(&knowledge);
        }
        if !context_block.is_empty() {
            messages.push(Message::system(context_block));
        }
        messages.extend(history);
        messages.push(Message::user(text));

        // 4. 首次生成
        let initial = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;
        tracing::debug!(user = user_id, preview = %initial.chars().take(200).collect::<String>(), "initial response");

        // 5. Action 行 → 工具调用 → Observation 喂回做二次生成
        let final_response = match extract_action(&initial) {
            Some((tool, params)) => {
                let outcome = self.tools.execute(&tool, &params, user_id).await;
                tracing::info!(
                    user = user_id,
                    tool = %tool,
                    failed = outcome.is_failure(),
                    "tool executed"
                );
                messages.push(Message::assistant(initial));
                messages.push(Message::user(format!(
                    "\nObservation: {}\n\nNow provide the final answer to the user.",
                    outcome.text()
                )));
                self.llm
                    .complete(&messages)
                    .await
                    .map_err(AgentError::LlmError)?
            }
            None => initial,
        };

        // 6. 反思（失败时内部退回原文，不会报错）
        let refined = self.reflector.refine(text, &final_response).await;

        // 7. 提取干净回答
        let answer = extract_answer(&refined);

        // 8. 双层记忆提交（存的是干净回答，不存中间推理）
        self.memory.append_short_term(user_id, text, &answer).await;
        self.memory.add_long_term(user_id, text, &answer);

        Ok(answer)
    }

    /// 该用户提到过的植物（近似提取）
    pub fn known_plants(&self, user_id: &str) -> Vec<String> {
        self.memory.known_plants(user_id)
    }

    /// 该用户的全部提醒
    pub async fn reminders(&self, user_id: &str) -> Vec<crate::tools::Reminder> {
        self.tools.reminders_for(user_id).await
    }

    /// 清除该用户的记忆与提醒；与进行中的轮次持同一把会话锁，不会交错
    pub async fn forget_user(&self, user_id: &str) {
        let lock = self.session_lock(user_id).await;
        let _guard = lock.lock().await;
        self.memory.clear_user(user_id).await;
        self.tools.clear_reminders(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_action_splits_at_first_colon() {
        let response = "Thought: need weather\nAction: weather: New York: NY\nAnswer: pending";
        let (tool, params) = extract_action(response).unwrap();
        assert_eq!(tool, "weather");
        // 参数里合法地再次出现分隔符
        assert_eq!(params, "New York: NY");
    }

    #[test]
    fn test_extract_action_absent() {
        assert!(extract_action("Thought: simple\nAnswer: done").is_none());
    }

    #[test]
    fn test_extract_action_malformed() {
        // 标记后没有分隔符：视为无工具调用
        assert!(extract_action("Action: just some words").is_none());
    }

    #[test]
    fn test_extract_answer_with_marker() {
        assert_eq!(
            extract_answer("Thought: ok\nAnswer: Water twice a week."),
            "Water twice a week."
        );
    }

    #[test]
    fn test_extract_answer_without_marker() {
        assert_eq!(extract_answer("  Water twice a week.  "), "Water twice a week.");
    }
}

//! Reflection：回答的二次自审
//!
//! 在回复定稿前做一次轻量 LLM 调用：好的回答保持原样，可改进的重写得更清晰友好，
//! 且只返回给用户的最终消息本身。调用失败或返回空时原样退回候选回答——
//! 反思永远不会让回复变空，也永远不会失败。

use std::sync::Arc;

use crate::llm::LlmClient;
use crate::memory::Message;

const REVIEWER_SYSTEM: &str = "You are a garden assistant response improver.";

const REVIEW_TEMPLATE: &str = "\
You are reviewing a chatbot's garden advice response.
If the response is already good, keep it as is.
If it can be improved, rewrite it in a clearer, more helpful, and friendly tone.

Important:
- Return only the improved final message for the user.
- Do NOT include explanations, analysis, or lists of improvements.
- Do NOT show reasoning or mention that it was improved.
- Keep it natural, like a helpful assistant message.

User Query: {query}
Your Response: {response}

Final improved message:";

/// 反思器：持有 LLM 与审阅模板
pub struct Reflector {
    llm: Arc<dyn LlmClient>,
}

impl Reflector {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 审阅候选回答；任何失败路径都退回 response 原文
    pub async fn refine(&self, query: &str, response: &str) -> String {
        let prompt = REVIEW_TEMPLATE
            .replace("{query}", query)
            .replace("{response}", response);
        let messages = [Message::system(REVIEWER_SYSTEM), Message::user(prompt)];
        match self.llm.complete(&messages).await {
            Ok(improved) => {
                let improved = improved.trim();
                if improved.is_empty() {
                    response.to_string()
                } else {
                    improved.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "reflection failed, keeping original response");
                response.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;

    #[tokio::test]
    async fn test_refine_returns_improved_text() {
        let llm = ScriptedLlm::new();
        llm.push("Water them every morning, ideally before the heat sets in.");
        let reflector = Reflector::new(Arc::new(llm));
        let out = reflector.refine("How do I water plants?", "Water them daily.").await;
        assert!(out.contains("every morning"));
    }

    #[tokio::test]
    async fn test_refine_falls_back_on_llm_failure() {
        let llm = ScriptedLlm::new();
        llm.push_failure("rate limited");
        let reflector = Reflector::new(Arc::new(llm));
        let out = reflector.refine("q", "original response").await;
        assert_eq!(out, "original response");
    }

    #[tokio::test]
    async fn test_refine_never_returns_empty() {
        let llm = ScriptedLlm::new();
        llm.push("   ");
        let reflector = Reflector::new(Arc::new(llm));
        let out = reflector.refine("q", "original response").await;
        assert_eq!(out, "original response");
    }
}

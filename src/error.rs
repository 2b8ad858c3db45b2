//! 编排边界错误类型
//!
//! 能力 trait（`LlmClient` / `Tool`）一律以 `Result<_, String>` 表达软错误，
//! 只有在单轮编排边界（`run_turn`）才归一为 `AgentError`。

use thiserror::Error;

/// 单轮编排过程中上抛到边界的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),
}

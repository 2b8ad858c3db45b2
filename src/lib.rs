//! Sprout - Rust 园艺顾问智能体
//!
//! 模块划分：
//! - **agent**: 单轮编排状态机（记忆装配、生成、工具调用、反思、记忆提交）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 编排边界错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）、嵌入提供方
//! - **memory**: 短期对话缓冲 / 用户隔离长期记忆 / 共享植物知识库
//! - **observability**: 日志初始化
//! - **planner**: 意图分类（规则优先 + LLM 兜底）
//! - **reflection**: 回答的二次自审
//! - **tools**: 工具箱（weather、calculator、reminder、search）与调度器

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod planner;
pub mod reflection;
pub mod tools;

pub use agent::{GardenAgent, RetrievalConfig, APOLOGY};
pub use error::AgentError;

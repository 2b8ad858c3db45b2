//! Sprout - Rust 园艺顾问智能体
//!
//! 入口：初始化日志与配置，装配记忆 / 工具 / Agent，然后跑控制台对话循环。
//! 聊天平台接入是薄适配层，这里用标准输入行协议承担同样的角色：
//! 普通行走完整单轮处理，斜杠命令查询植物 / 提醒或清除记忆。

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;

use sprout::agent::{GardenAgent, RetrievalConfig};
use sprout::config::load_config;
use sprout::llm::{create_embedder_from_env, LlmClient, OpenAiClient, ScriptedLlm};
use sprout::memory::{EmbeddingVectorStore, MemoryManager};
use sprout::tools::{DuckDuckGoClient, OpenWeatherClient, ReminderStore, ToolDispatcher};

const HELP: &str = "\
Garden Advisor - commands:
  /help       show this message
  /plants     list plants you have mentioned
  /reminders  show your watering reminders
  /clear      clear your conversation history and reminders
  /quit       exit
Anything else is sent to the advisor.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sprout::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        sprout::config::AppConfig::default()
    });

    let data_dir = cfg.data_dir();
    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    // LLM：有 Key 走 OpenAI 兼容端点（Groq 等），否则用脚本化客户端便于离线试跑
    let llm: Arc<dyn LlmClient> = if std::env::var("OPENAI_API_KEY").is_ok() {
        tracing::info!(model = %cfg.llm.model, "using OpenAI-compatible LLM");
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            None,
        ))
    } else {
        tracing::warn!("No OPENAI_API_KEY set, using scripted LLM");
        Arc::new(ScriptedLlm::new())
    };

    let embedder = create_embedder_from_env(cfg.llm.base_url.as_deref(), &cfg.llm.embedding_model);
    let long_term = Arc::new(EmbeddingVectorStore::with_snapshot(
        embedder.clone(),
        cfg.memory.max_entries_per_user * 10,
        data_dir.join("long_term.json"),
    ));
    let knowledge = Arc::new(EmbeddingVectorStore::with_snapshot(
        embedder,
        1000,
        data_dir.join("knowledge.json"),
    ));
    let memory = Arc::new(MemoryManager::new(long_term, knowledge, cfg.memory.max_turns));

    let tools = ToolDispatcher::new(
        Arc::new(OpenWeatherClient::new(
            &cfg.weather.base_url,
            cfg.weather.timeout_secs,
        )),
        Arc::new(DuckDuckGoClient::new(cfg.search.timeout_secs)),
        cfg.search.enabled,
        cfg.search.max_results,
        Arc::new(ReminderStore::new(data_dir.join("reminders.json"))),
    );

    let agent = GardenAgent::new(
        llm,
        memory,
        tools,
        RetrievalConfig {
            long_term_top_n: cfg.memory.long_term_top_n,
            knowledge_top_n: cfg.memory.knowledge_top_n,
        },
    );

    let user_id = std::env::var("SPROUT_USER").unwrap_or_else(|_| "local".to_string());
    tracing::info!(user = %user_id, "garden advisor ready");
    println!("Garden Advisor is ready! Type /help for commands.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "/quit" => break,
            "/help" => println!("{}", HELP),
            "/plants" => {
                let plants = agent.known_plants(&user_id);
                if plants.is_empty() {
                    println!("You haven't mentioned any plants yet. Tell me about your garden!");
                } else {
                    println!("Your plants:\n{}", plants.join("\n"));
                }
            }
            "/reminders" => {
                let reminders = agent.reminders(&user_id).await;
                let active: Vec<String> = reminders
                    .iter()
                    .filter(|r| r.active)
                    .enumerate()
                    .map(|(i, r)| format!("{}. {}", i + 1, r.schedule))
                    .collect();
                if active.is_empty() {
                    println!("You have no active reminders.");
                } else {
                    println!("Your reminders:\n{}", active.join("\n"));
                }
            }
            "/clear" => {
                agent.forget_user(&user_id).await;
                println!("Your conversation history has been cleared.");
            }
            _ => {
                let answer = agent.process_message(&user_id, input).await;
                println!("{}", answer);
            }
        }
    }

    Ok(())
}

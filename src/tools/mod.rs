//! 工具箱：封闭集合（weather / calculator / reminder / search）与调度器
//!
//! 工具集是封闭的枚举而非开放注册表；调度统一走 ToolDispatcher::execute，
//! 未知工具名、参数问题、上游失败全部以 ToolOutcome::Failure 的描述字符串收尾，
//! 任何失败都不会越过调度边界成为异常。

pub mod calculator;
pub mod reminder;
pub mod search;
pub mod weather;

use std::sync::Arc;
use std::time::Instant;

pub use calculator::calculate;
pub use reminder::{Reminder, ReminderStore};
pub use search::{DuckDuckGoClient, SearchHit, SearchProvider};
pub use weather::{OpenWeatherClient, WeatherProvider, WeatherReport};

/// 已注册的工具种类（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Weather,
    Calculator,
    Reminder,
    Search,
}

impl ToolKind {
    /// 规范化解析工具名（大小写 / 首尾空白不敏感）；未知名返回 None
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "weather" => Some(Self::Weather),
            "calculator" => Some(Self::Calculator),
            "reminder" => Some(Self::Reminder),
            "search" => Some(Self::Search),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Calculator => "calculator",
            Self::Reminder => "reminder",
            Self::Search => "search",
        }
    }
}

/// 工具执行结果：成功文本或软失败原因。两者都会作为 Observation 喂回 LLM。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    /// 观察文本（成功与失败都有内容）
    pub fn text(&self) -> &str {
        match self {
            Self::Success(s) | Self::Failure(s) => s,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// 工具调度器：持有四个工具所需的能力实现
pub struct ToolDispatcher {
    weather: Arc<dyn WeatherProvider>,
    search: Arc<dyn SearchProvider>,
    search_enabled: bool,
    search_max_results: usize,
    reminders: Arc<ReminderStore>,
}

impl ToolDispatcher {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        search: Arc<dyn SearchProvider>,
        search_enabled: bool,
        search_max_results: usize,
        reminders: Arc<ReminderStore>,
    ) -> Self {
        Self {
            weather,
            search,
            search_enabled,
            search_max_results,
            reminders,
        }
    }

    /// 供 system prompt 使用的工具说明
    pub fn descriptions() -> &'static str {
        "1. weather: location - Get current weather for a location\n\
         Example: weather: New York\n\n\
         2. calculator: expression - Calculate water needs, pH, etc.\n\
         Example: calculator: 5 * 2.5 (liters per plant)\n\n\
         3. reminder: schedule - Set watering reminder\n\
         Example: reminder: Water tomatoes every 3 days\n\n\
         4. search: query - Search for plant information online\n\
         Example: search: rare orchid care tips"
    }

    /// 执行工具；未知名与所有处理失败都折叠为 Failure 字符串，并输出审计日志
    pub async fn execute(&self, name: &str, params: &str, user_id: &str) -> ToolOutcome {
        let Some(kind) = ToolKind::parse(name) else {
            return ToolOutcome::Failure(format!("Unknown tool: {}", name.trim()));
        };

        let start = Instant::now();
        let outcome = match kind {
            ToolKind::Weather => weather::run(self.weather.as_ref(), params).await,
            ToolKind::Calculator => calculator::run(params),
            ToolKind::Reminder => reminder::run(&self.reminders, params, user_id).await,
            ToolKind::Search => {
                search::run(
                    self.search.as_ref(),
                    self.search_enabled,
                    self.search_max_results,
                    params,
                )
                .await
            }
        };

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": kind.name(),
            "ok": !outcome.is_failure(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "params_preview": params.chars().take(120).collect::<String>(),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        outcome
    }

    /// 该用户的全部提醒（控制台前端使用）
    pub async fn reminders_for(&self, user_id: &str) -> Vec<Reminder> {
        self.reminders.list(user_id).await
    }

    /// 删除该用户的全部提醒
    pub async fn clear_reminders(&self, user_id: &str) {
        self.reminders.clear(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(ToolKind::parse("  Weather "), Some(ToolKind::Weather));
        assert_eq!(ToolKind::parse("CALCULATOR"), Some(ToolKind::Calculator));
        assert_eq!(ToolKind::parse("not_a_tool"), None);
    }
}

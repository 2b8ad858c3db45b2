//! Planner：意图分类与步骤规划
//!
//! 规则表按固定优先级顺序匹配关键词（首个命中即定类，weather_check 优先于 plant_care
//! 是有意设计的决胜顺序，不是偶然产物）；关键词同时收录英语与印尼语拼写。
//! 无规则命中时走 LLM 兜底：要求输出 JSON，提取首个花括号片段解析；解析失败降级为
//! 按行启发式，调用失败再降级为固定兜底计划。create_plan 永不报错。
//! 计划只用于日志与遥测，不改变编排控制流。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::LlmClient;
use crate::memory::Message;

/// 查询类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    WeatherCheck,
    Reminder,
    Calculation,
    Search,
    PlantCare,
    General,
    /// LLM 兜底产生、但 JSON 解析失败后按行切出的计划
    LlmGenerated,
    /// LLM 调用本身失败后的固定兜底
    FallbackGeneral,
}

impl QueryKind {
    fn from_llm_type(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "weather_check" => Self::WeatherCheck,
            "reminder" => Self::Reminder,
            "calculation" => Self::Calculation,
            "search" => Self::Search,
            "plant_care" => Self::PlantCare,
            _ => Self::General,
        }
    }
}

/// 复杂度估计
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    fn from_llm(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// 单轮计划（瞬态值，不持久化）
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub query: String,
    pub kind: QueryKind,
    pub steps: Vec<String>,
    pub requires_tools: bool,
    pub complexity: Complexity,
}

/// 规则表：按此顺序求值，首个命中即定类。
/// 顺序即优先级（同时含 weather 与 plant_care 关键词的查询判为 weather_check）。
/// 每个类别内同时收录英语与印尼语关键词。
const RULES: &[(QueryKind, &[&str])] = &[
    (
        QueryKind::WeatherCheck,
        &[
            "weather", "rain", "temperature", "forecast", "should i water",
            "cuaca", "hujan", "suhu",
        ],
    ),
    (
        QueryKind::Reminder,
        &[
            "remind", "schedule", "set reminder", "notify",
            "ingatkan", "jadwal",
        ],
    ),
    (
        QueryKind::Calculation,
        &[
            "calculate", "how much", "how many", "liters", "gallons",
            "hitung", "berapa",
        ],
    ),
    (
        QueryKind::Search,
        &["search", "find", "look up", "information about", "cari"],
    ),
    (
        QueryKind::PlantCare,
        &[
            "how to", "care for", "grow", "plant", "water frequency", "sunlight",
            "cara", "tanaman", "merawat",
        ],
    ),
];

/// LLM 兜底的 JSON 结构
#[derive(Deserialize)]
struct LlmPlan {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    requires_tools: bool,
    #[serde(default)]
    estimated_complexity: String,
}

/// 从文本中提取首个花括号配对的 JSON 片段
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Planner：规则分类 + LLM 兜底
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 为查询生成计划；永不报错（三级降级：结构化解析 → 按行启发式 → 固定兜底）
    pub async fn create_plan(&self, query: &str, context: &str) -> Plan {
        let lower = query.to_lowercase();
        for (kind, keywords) in RULES {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return self.rule_plan(query, *kind);
            }
        }
        self.llm_fallback_plan(query, context).await
    }

    /// 规则命中后的固定模板计划
    fn rule_plan(&self, query: &str, kind: QueryKind) -> Plan {
        let (steps, requires_tools, complexity): (&[&str], bool, Complexity) = match kind {
            QueryKind::WeatherCheck => (
                &[
                    "Check current weather",
                    "Analyze if watering is needed",
                    "Provide recommendation",
                ],
                true,
                Complexity::Medium,
            ),
            QueryKind::Reminder => (
                &["Parse schedule details", "Create reminder", "Confirm with user"],
                true,
                Complexity::Low,
            ),
            QueryKind::Calculation => (
                &["Parse calculation request", "Execute calculation", "Explain result"],
                true,
                Complexity::Low,
            ),
            QueryKind::Search => (
                &["Search for information", "Summarize findings", "Provide answer"],
                true,
                Complexity::Medium,
            ),
            QueryKind::PlantCare => (
                &[
                    "Identify plant",
                    "Retrieve care knowledge",
                    "Provide personalized advice",
                ],
                false,
                Complexity::Medium,
            ),
            _ => (
                &["Understand query", "Check memory for context", "Provide helpful response"],
                false,
                Complexity::Low,
            ),
        };
        Plan {
            query: query.to_string(),
            kind,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            requires_tools,
            complexity,
        }
    }

    /// LLM 兜底：结构化解析 → 按行启发式（llm_generated）→ 固定兜底（fallback_general）
    async fn llm_fallback_plan(&self, query: &str, context: &str) -> Plan {
        let prompt = format!(
            "Classify this garden-related query and produce a short plan.\n\
             Reply with a single JSON object: {{\"type\": one of weather_check|reminder|\
             calculation|search|plant_care|general, \"steps\": [..], \"requires_tools\": bool, \
             \"estimated_complexity\": \"low\"|\"medium\"|\"high\"}}.\n\n\
             Context: {}\nQuery: {}",
            context, query
        );
        let messages = [Message::user(prompt)];
        let reply = match self.llm.complete(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "plan fallback LLM call failed");
                return Plan {
                    query: query.to_string(),
                    kind: QueryKind::FallbackGeneral,
                    steps: vec!["Respond with general gardening guidance".to_string()],
                    requires_tools: false,
                    complexity: Complexity::Low,
                };
            }
        };

        if let Some(json) = extract_json_object(&reply) {
            if let Ok(parsed) = serde_json::from_str::<LlmPlan>(json) {
                return Plan {
                    query: query.to_string(),
                    kind: QueryKind::from_llm_type(&parsed.kind),
                    steps: parsed.steps,
                    requires_tools: parsed.requires_tools,
                    complexity: Complexity::from_llm(&parsed.estimated_complexity),
                };
            }
        }

        // JSON 不可用：把每个非空行当作一个步骤
        let steps: Vec<String> = reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Plan {
            query: query.to_string(),
            kind: QueryKind::LlmGenerated,
            steps,
            requires_tools: false,
            complexity: Complexity::Low,
        }
    }
}

/// 根据反馈调整计划：纯函数。反馈含失败/错误指示时追加重试步骤并抬高复杂度，否则原样返回。
pub fn adjust_plan(plan: &Plan, feedback: &str) -> Plan {
    let lower = feedback.to_lowercase();
    let mut adjusted = plan.clone();
    if lower.contains("error") || lower.contains("failed") {
        adjusted
            .steps
            .push("Retry with alternative approach".to_string());
        adjusted.complexity = Complexity::High;
    }
    adjusted
}

//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SPROUT__*` 覆盖（双下划线表示嵌套，
//! 如 `SPROUT__SEARCH__ENABLED=true`）。API Key 只从环境变量读取
//! （OPENAI_API_KEY / WEATHER_API_KEY），不落盘。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub weather: WeatherSection,
    #[serde(default)]
    pub search: SearchSection,
}

/// [app] 段：应用名与数据目录（长期记忆快照、提醒文件都放这里）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 数据根目录，未设置时用 ./data
    pub data_dir: Option<PathBuf>,
}

/// [llm] 段：OpenAI 兼容端点（Groq 等均可通过 base_url 接入）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// [memory] 段：短期轮数与检索条数
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    /// 每用户保留的对话轮数（短期记忆，每轮 user + assistant 两条）
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// 长期记忆检索条数
    #[serde(default = "default_long_term_top_n")]
    pub long_term_top_n: usize,
    /// 知识库检索条数
    #[serde(default = "default_knowledge_top_n")]
    pub knowledge_top_n: usize,
    /// 每用户长期记忆条目上限
    #[serde(default = "default_max_entries_per_user")]
    pub max_entries_per_user: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            long_term_top_n: default_long_term_top_n(),
            knowledge_top_n: default_knowledge_top_n(),
            max_entries_per_user: default_max_entries_per_user(),
        }
    }
}

fn default_max_turns() -> usize {
    10
}

fn default_long_term_top_n() -> usize {
    3
}

fn default_knowledge_top_n() -> usize {
    2
}

fn default_max_entries_per_user() -> usize {
    500
}

/// [weather] 段：OpenWeatherMap 端点与超时；Key 来自 WEATHER_API_KEY
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    10
}

/// [search] 段：网页搜索开关、结果条数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    /// 默认关闭，显式开启后才会发起外部请求
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            enabled: false,
            max_results: default_search_max_results(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_max_results() -> usize {
    3
}

fn default_search_timeout_secs() -> u64 {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            memory: MemorySection::default(),
            weather: WeatherSection::default(),
            search: SearchSection::default(),
        }
    }
}

impl AppConfig {
    /// 数据根目录（长期记忆快照与提醒文件的父目录）
    pub fn data_dir(&self) -> PathBuf {
        self.app
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./data"))
    }
}

/// 从 config 目录加载配置，环境变量 SPROUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SPROUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SPROUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

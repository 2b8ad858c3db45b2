//! Weather 工具：查询当前天气并给出浇水建议
//!
//! WeatherProvider 抽象外部天气能力；OpenWeatherClient 调 OpenWeatherMap（公制单位，带超时）。
//! Key 缺失或请求失败都折叠为描述性 Failure 字符串。

use async_trait::async_trait;
use serde::Deserialize;

use crate::tools::ToolOutcome;

/// 天气数据（与浇水建议判断所需字段一致）
#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub description: String,
    pub wind_speed: f64,
}

/// 外部天气能力
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<WeatherReport, String>;

    /// 凭据是否就绪；未就绪时工具直接返回配置缺失提示，不发请求
    fn configured(&self) -> bool {
        true
    }
}

/// OpenWeatherMap 响应（只取用到的字段）
#[derive(Deserialize)]
struct OwmResponse {
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

/// OpenWeatherMap 客户端：Key 来自 WEATHER_API_KEY
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        let api_key = std::env::var("WEATHER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, location: &str) -> Result<WeatherReport, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "Weather API key not configured".to_string())?;
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location.trim()), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        let data: OwmResponse = response
            .json()
            .await
            .map_err(|e| format!("Weather data format error: {}", e))?;
        Ok(WeatherReport {
            temperature: data.main.temp,
            feels_like: data.main.feels_like,
            humidity: data.main.humidity,
            description: data
                .weather
                .first()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            wind_speed: data.wind.speed,
        })
    }
}

/// 由天气数据推导浇水建议（阈值与条件判断）
fn watering_advice(report: &WeatherReport) -> &'static str {
    let description = report.description.to_lowercase();
    if report.humidity < 40.0 || report.temperature > 30.0 {
        "Plants may need extra watering due to dry/hot conditions."
    } else if ["rain", "drizzle", "thunderstorm"]
        .iter()
        .any(|c| description.contains(c))
    {
        "Rain expected - you can skip watering today."
    } else {
        "Good conditions for regular watering schedule."
    }
}

/// 执行 weather 工具：汇总天气 + 浇水建议；任何失败折叠为 Failure
pub async fn run(provider: &dyn WeatherProvider, location: &str) -> ToolOutcome {
    let location = location.trim();
    if !provider.configured() {
        return ToolOutcome::Failure("Weather API key not configured".to_string());
    }
    match provider.fetch(location).await {
        Ok(report) => {
            let summary = format!(
                "Weather in {}:\n\
                 Temperature: {}°C (feels like {}°C)\n\
                 Conditions: {}\n\
                 Humidity: {}%\n\
                 Wind: {} m/s\n\n{}",
                location,
                report.temperature,
                report.feels_like,
                report.description,
                report.humidity,
                report.wind_speed,
                watering_advice(&report),
            );
            ToolOutcome::Success(summary)
        }
        Err(e) => {
            tracing::warn!(location, error = %e, "weather fetch failed");
            ToolOutcome::Failure(format!(
                "Could not retrieve weather for {}. Please check the location name.",
                location
            ))
        }
    }
}

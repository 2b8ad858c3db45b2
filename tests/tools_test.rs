//! 工具调度器集成测试：未知工具软失败、经调度器的各工具契约

use std::sync::Arc;

use async_trait::async_trait;

use sprout::tools::{
    ReminderStore, SearchHit, SearchProvider, ToolDispatcher, WeatherProvider, WeatherReport,
};

struct NoWeather;

#[async_trait]
impl WeatherProvider for NoWeather {
    fn configured(&self) -> bool {
        false
    }

    async fn fetch(&self, _location: &str) -> Result<WeatherReport, String> {
        Err("no key".to_string())
    }
}

struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, String> {
        Err("unreachable".to_string())
    }
}

fn dispatcher(dir: &tempfile::TempDir, search_enabled: bool) -> ToolDispatcher {
    ToolDispatcher::new(
        Arc::new(NoWeather),
        Arc::new(NoSearch),
        search_enabled,
        3,
        Arc::new(ReminderStore::new(dir.path().join("reminders.json"))),
    )
}

#[tokio::test]
async fn test_unknown_tool_is_soft_failure() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);
    let outcome = d.execute("not_a_tool", "x", "u1").await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("Unknown tool"));
}

#[tokio::test]
async fn test_calculator_through_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);
    let outcome = d.execute("calculator", "10 + 5", "u1").await;
    assert!(!outcome.is_failure());
    assert!(outcome.text().contains("15"));
}

#[tokio::test]
async fn test_tool_name_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);
    let outcome = d.execute("  Calculator ", "2 * 3", "u1").await;
    assert!(outcome.text().contains("6"));
}

#[tokio::test]
async fn test_reminder_roundtrip_through_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);

    let outcome = d.execute("reminder", "Water tomatoes every 3 days", "u1").await;
    assert!(!outcome.is_failure());
    assert!(outcome.text().contains("Water tomatoes every 3 days"));

    let reminders = d.reminders_for("u1").await;
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].schedule, "Water tomatoes every 3 days");

    d.clear_reminders("u1").await;
    assert!(d.reminders_for("u1").await.is_empty());
}

#[tokio::test]
async fn test_weather_without_key_is_descriptive() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);
    let outcome = d.execute("weather", "New York", "u1").await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("not configured"));
}

#[tokio::test]
async fn test_disabled_search_message() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, false);
    let outcome = d.execute("search", "rare orchid care tips", "u1").await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("not enabled"));
}

#[tokio::test]
async fn test_enabled_search_failure_is_descriptive() {
    let dir = tempfile::tempdir().unwrap();
    let d = dispatcher(&dir, true);
    let outcome = d.execute("search", "rare orchid care tips", "u1").await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("Search failed"));
}

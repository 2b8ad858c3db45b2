//! Search 工具：网页搜索（可配置开关）
//!
//! SearchProvider 抽象外部搜索能力；DuckDuckGoClient 抓取 HTML 结果页并用正则抽取
//! 标题 / 摘要 / 链接。配置未开启时返回固定提示，不发任何请求；
//! 上游失败与零结果都以描述字符串收尾。

use async_trait::async_trait;
use regex::Regex;

use crate::tools::ToolOutcome;

/// 单条搜索命中
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// 外部搜索能力
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String>;
}

/// 简易去除 HTML 标签并折叠空白
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// DuckDuckGo HTML 端点客户端
pub struct DuckDuckGoClient {
    client: reqwest::Client,
    base_url: String,
    result_re: Regex,
    snippet_re: Regex,
}

impl DuckDuckGoClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self::with_base_url("https://html.duckduckgo.com/html/", timeout_secs)
    }

    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Self {
        const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.to_string(),
            // 结果页结构：<a class="result__a" href="URL">TITLE</a> 与 class="result__snippet"
            result_re: Regex::new(r#"(?s)class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
                .expect("valid result regex"),
            snippet_re: Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#)
                .expect("valid snippet regex"),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;

        let snippets: Vec<String> = self
            .snippet_re
            .captures_iter(&body)
            .map(|c| strip_html_tags(&c[1]))
            .collect();

        let hits = self
            .result_re
            .captures_iter(&body)
            .take(max_results)
            .enumerate()
            .map(|(i, c)| SearchHit {
                title: strip_html_tags(&c[2]),
                snippet: snippets.get(i).cloned().unwrap_or_default(),
                url: c[1].to_string(),
            })
            .collect();
        Ok(hits)
    }
}

/// 把命中列表排成编号文本（摘要截断到 150 字符）
fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Search results for '{}':\n\n", query);
    for (i, hit) in hits.iter().enumerate() {
        let snippet: String = hit.snippet.chars().take(150).collect();
        out.push_str(&format!("{}. {}\n   {}...\n   {}\n\n", i + 1, hit.title, snippet, hit.url));
    }
    out
}

/// 执行 search 工具：未开启返回固定提示；失败与零结果都是描述字符串
pub async fn run(
    provider: &dyn SearchProvider,
    enabled: bool,
    max_results: usize,
    query: &str,
) -> ToolOutcome {
    if !enabled {
        return ToolOutcome::Failure(
            "Web search is not enabled. Enable it in the configuration to use this feature."
                .to_string(),
        );
    }
    let query = query.trim();
    match provider.search(query, max_results).await {
        Ok(hits) if hits.is_empty() => ToolOutcome::Failure("No results found".to_string()),
        Ok(hits) => ToolOutcome::Success(format_hits(query, &hits)),
        Err(e) => {
            tracing::warn!(query, error = %e, "search failed");
            ToolOutcome::Failure(format!("Search failed: {}", e))
        }
    }
}

//! Web 搜索工具：DuckDuckGo HTML 端点
//!
//! GET 请求带超时与 User-Agent；从结果页提取标题、摘要与真实 URL（解开 /l/?uddg= 跳转），
//! 广告结果（y.js）丢弃。标题与摘要先去标签，再用 html2text 解码实体。

use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::{Client, Url};

use crate::core::SearchResult;
use crate::tools::WebSearch;

/// DuckDuckGo 搜索：无需 API Key
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        resp.text().await.map_err(|e| format!("Read body: {}", e))
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, String> {
        let query = query.trim();
        if query.is_empty() {
            return Err("Missing query".to_string());
        }
        tracing::info!(query = %query, limit, "web search");
        let html = self.fetch(query).await?;
        Ok(parse_results(&html, limit))
    }
}

/// 从 DuckDuckGo HTML 结果页解析至多 limit 条结果
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let (Ok(title_re), Ok(href_re), Ok(snippet_re)) = (
        Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#),
        Regex::new(r#"href="([^"]*)""#),
        Regex::new(r#"(?s)<(?:a|div)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div)>"#),
    ) else {
        return Vec::new();
    };

    let titles: Vec<_> = title_re.captures_iter(html).collect();
    let mut results = Vec::new();

    for (i, caps) in titles.iter().enumerate() {
        if results.len() >= limit {
            break;
        }
        let (Some(whole), Some(attrs), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(href) = href_re.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
            continue;
        };
        let url = resolve_url(href.as_str());
        if url.is_empty() || url.contains("duckduckgo.com/y.js") {
            continue;
        }

        // 摘要位于本条标题之后、下一条标题之前
        let block_end = titles
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let block = &html[whole.end()..block_end];
        let snippet = snippet_re
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| clean_fragment(m.as_str()))
            .unwrap_or_default();

        let title = clean_fragment(inner.as_str());
        results.push(SearchResult {
            title: if title.is_empty() { "No title".to_string() } else { title },
            snippet: if snippet.is_empty() { "No snippet".to_string() } else { snippet },
            url,
        });
    }

    results
}

/// 将结果页中的链接还原为目标 URL：//duckduckgo.com/l/?uddg=<编码后的地址>
fn resolve_url(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };
    match Url::parse(&absolute) {
        Ok(url) if url.path().starts_with("/l/") => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// 去标签、解码实体、压缩空白
fn clean_fragment(fragment: &str) -> String {
    let without_tags = strip_html_tags(fragment);
    let decoded = match from_read(without_tags.as_bytes(), 400) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => without_tags,
    };
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 简易去除 HTML 标签
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
    out
}

/// 将搜索结果格式化为编号文本块，作为后续步骤与回答的上下文
pub fn format_search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No search results found.".to_string();
    }

    let mut formatted = format!("Found {} search results:\n\n", results.len());
    for (i, r) in results.iter().enumerate() {
        formatted.push_str(&format!(
            "{}. {}\n   {}\n   Source: {}\n\n",
            i + 1,
            r.title,
            r.snippet,
            r.url
        ));
    }
    formatted
}

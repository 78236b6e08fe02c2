//! 工具执行器
//!
//! 持有搜索与摘要两个协作者及全局超时；每次调用在超时内执行，
//! 超时或失败时转为 AgentError（ToolTimeout / ToolExecutionFailed），并输出结构化审计日志（JSON）。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{AgentError, SearchResult, Summary, ToolKind};
use crate::tools::{Summarizer, WebSearch};

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    search: Arc<dyn WebSearch>,
    summarizer: Arc<dyn Summarizer>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(
        search: Arc<dyn WebSearch>,
        summarizer: Arc<dyn Summarizer>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            search,
            summarizer,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 工具清单（`- 名称: 描述` 每行一个），拼入规划 prompt
    pub fn catalog() -> String {
        ToolKind::ALL
            .iter()
            .map(|t| format!("- {}: {}\n", t, t.description()))
            .collect()
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, AgentError> {
        let args = serde_json::json!({ "query": query, "limit": limit });
        self.audited(ToolKind::WebSearch, &args, self.search.search(query, limit))
            .await
    }

    pub async fn summarize(&self, text: &str, context: &str) -> Result<Summary, AgentError> {
        let args = serde_json::json!({ "context": context, "chars": text.chars().count() });
        self.audited(ToolKind::Summarize, &args, self.summarizer.summarize(text, context))
            .await
    }

    async fn audited<T, F>(
        &self,
        tool: ToolKind,
        args: &serde_json::Value,
        call: F,
    ) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, String>>,
    {
        let start = Instant::now();
        let result = timeout(self.timeout, call).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool.as_str(),
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(args),
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool.as_str().to_string())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct SlowSearch;

    #[async_trait]
    impl WebSearch for SlowSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchResult>, String> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenSummarizer;

    #[async_trait]
    impl Summarizer for BrokenSummarizer {
        async fn summarize(&self, _text: &str, _context: &str) -> Result<Summary, String> {
            Err("rate limited".to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_tool_timeout() {
        let exec = ToolExecutor::new(Arc::new(SlowSearch), Arc::new(BrokenSummarizer), 1);
        let err = exec.search("q", 5).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(ref t) if t == "web_search"));
    }

    #[tokio::test]
    async fn test_failure_maps_to_execution_failed() {
        let exec = ToolExecutor::new(Arc::new(SlowSearch), Arc::new(BrokenSummarizer), 1);
        let err = exec.summarize("text", "ctx").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed(ref m) if m == "rate limited"));
    }

    #[test]
    fn test_catalog_lists_every_tool() {
        assert_eq!(
            ToolExecutor::catalog(),
            "- web_search: Search the web for information\n- summarize: Extract key information from search results\n"
        );
    }

    #[test]
    fn test_args_preview_truncates() {
        let long = serde_json::json!({ "q": "x".repeat(500) });
        assert!(args_preview(&long).ends_with("..."));
    }
}

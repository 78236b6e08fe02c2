//! 外部协作者抽象
//!
//! 搜索与摘要均视为不透明的 I/O 边界：实现返回 Result<_, String>，
//! 由 ToolExecutor 统一加超时、写审计日志并转为 AgentError。

use async_trait::async_trait;

use crate::core::{SearchResult, Summary};

/// 网页搜索：给定查询返回有序的 title/snippet/url 记录，可为空
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, String>;
}

/// 文本摘要：返回要点、主题与置信度
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, context: &str) -> Result<Summary, String>;
}

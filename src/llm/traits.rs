//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Groq / Mock）实现 LlmClient::complete；调用方负责防御性解析结构化输出。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用失败（网络、鉴权、限流、空响应）
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("request build failed: {0}")]
    Request(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("empty response")]
    EmptyResponse,
}

/// 单次调用的采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 后端使用的模型名（日志用）
    fn model(&self) -> &str {
        "unknown"
    }
}

/// 去掉 ```json ... ``` / ``` ... ``` 包裹；无代码块时截取最外层 {...}，都没有则原样返回
pub fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

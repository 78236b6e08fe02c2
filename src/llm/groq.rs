//! Groq API 客户端（OpenAI 兼容格式）
//!
//! Groq 提供与 OpenAI 兼容的 Chat Completions 接口。
//! - Base URL: https://api.groq.com/openai/v1
//! - 模型: llama-3.1-8b-instant (回答), llama-3.3-70b-versatile (结构化输出)

use crate::llm::OpenAiClient;

/// Groq API 常量
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_INSTANT: &str = "llama-3.1-8b-instant";
pub const GROQ_VERSATILE: &str = "llama-3.3-70b-versatile";

/// 创建 Groq 客户端；base_url 为 None 时使用官方端点
pub fn create_groq_client(api_key: &str, model: &str, base_url: Option<&str>) -> OpenAiClient {
    OpenAiClient::new(Some(base_url.unwrap_or(GROQ_BASE_URL)), model, api_key)
}

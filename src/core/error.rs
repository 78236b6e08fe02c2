//! Agent 错误类型
//!
//! 只有 Config 会终止进程；其余错误在调用点被降级为回退值（未执行的工具记录、兜底计划）。
//! 持久化失败不经过这里，由 MistakeStore 记录日志后吞掉。

use thiserror::Error;

use crate::llm::LlmError;

/// 研究流程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 缺少必需凭据等配置问题，启动即失败
    #[error("Config error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),
}

//! 核心层：错误类型、数据模型、研究主循环

pub mod agent;
pub mod error;
pub mod types;

pub use agent::{
    create_llm_from_config, scheduled_mistake_probability, LlmClients, ResearchAgent,
    ResearchOutcome,
};
pub use error::AgentError;
pub use types::*;

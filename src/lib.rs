//! Scout - Rust 自我改进研究智能体
//!
//! 模块划分：
//! - **agents**: Planner、Executor、Evaluator、Learner 四个角色
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、数据模型、研究主循环
//! - **demo**: 学习过程演示
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Groq / Mock）
//! - **memory**: 错误记忆持久化与行为修正
//! - **observability**: 日志初始化
//! - **report**: 终端着色输出
//! - **tools**: 搜索与摘要协作者、工具执行器、计划 Schema

pub mod agents;
pub mod config;
pub mod core;
pub mod demo;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod report;
pub mod tools;

pub use core::{ResearchAgent, ResearchOutcome};

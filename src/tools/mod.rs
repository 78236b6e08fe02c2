//! 工具层：搜索 / 摘要协作者、执行器、计划 Schema

pub mod executor;
pub mod registry;
pub mod schema;
pub mod search;
pub mod summarize;

pub use executor::ToolExecutor;
pub use registry::{Summarizer, WebSearch};
pub use schema::plan_schema_json;
pub use search::{format_search_results, DuckDuckGoSearch};
pub use summarize::LlmSummarizer;

//! 研究计划 JSON Schema 生成（schemars 由类型自动生成）
//!
//! 拼入严格档位的规划 prompt，减少 LLM 输出格式错误。

use schemars::schema_for;

use crate::core::ResearchPlan;

/// 返回 ResearchPlan 的 JSON Schema 字符串
pub fn plan_schema_json() -> String {
    let schema = schema_for!(ResearchPlan);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

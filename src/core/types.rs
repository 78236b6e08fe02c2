//! 数据模型：计划、工具执行记录、评估结果、错误记录、学习规则、记忆快照
//!
//! 与 LLM / 磁盘交互的结构均可序列化；字段名与持久化文件保持一致，缺省字段按默认值补齐。

use std::fmt;

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 计划中的单个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 步骤序号，从 1 开始递增
    pub step_number: u32,
    /// 本步要做什么
    pub description: String,
    /// 需要的工具名（web_search / summarize），不需要时为 null
    #[serde(default)]
    pub tool_required: Option<String>,
    /// 为什么需要这一步
    #[serde(default)]
    pub reasoning: String,
}

impl PlanStep {
    /// 将 tool_required 解析为已知工具；"null"、"none"、空串与未知名称均视为无工具
    pub fn tool(&self) -> Option<ToolKind> {
        self.tool_required.as_deref().and_then(ToolKind::from_name)
    }
}

/// 针对一个问题的完整研究计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchPlan {
    /// 研究问题原文
    #[serde(default)]
    pub question: String,
    /// 有序步骤
    pub steps: Vec<PlanStep>,
    /// 预计耗时
    #[serde(default = "default_estimated_time")]
    pub estimated_time: String,
}

fn default_estimated_time() -> String {
    "2-3 minutes".to_string()
}

impl ResearchPlan {
    /// 兜底计划：一步、无工具（规划失败时使用）
    pub fn fallback(question: &str) -> Self {
        Self {
            question: question.to_string(),
            steps: vec![PlanStep {
                step_number: 1,
                description: "Answer based on general knowledge".to_string(),
                tool_required: None,
                reasoning: "Fallback due to planning error".to_string(),
            }],
            estimated_time: "1 minute".to_string(),
        }
    }

    /// 按 step_number 稳定排序后重新编号为 1..=n，保证序号唯一且递增
    pub fn normalize(&mut self) {
        self.steps.sort_by_key(|s| s.step_number);
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.step_number = i as u32 + 1;
        }
    }
}

/// 执行器认识的工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    Summarize,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::WebSearch, ToolKind::Summarize];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::Summarize => "summarize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "web_search" => Some(ToolKind::WebSearch),
            "summarize" => Some(ToolKind::Summarize),
            _ => None,
        }
    }

    /// 工具描述（拼入规划 prompt 的 AVAILABLE TOOLS 段落）
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "Search the web for information",
            ToolKind::Summarize => "Extract key information from search results",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次工具尝试的结果；executed=false 时必有 error 或跳过原因（output_summary）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_name: ToolKind,
    pub executed: bool,
    pub output_summary: Option<String>,
    pub error: Option<String>,
}

impl ToolExecution {
    pub fn completed(tool: ToolKind, summary: impl Into<String>) -> Self {
        Self {
            tool_name: tool,
            executed: true,
            output_summary: Some(summary.into()),
            error: None,
        }
    }

    /// 主动跳过（故障注入或无数据可处理）
    pub fn skipped(tool: ToolKind, reason: impl Into<String>) -> Self {
        Self {
            tool_name: tool,
            executed: false,
            output_summary: Some(reason.into()),
            error: None,
        }
    }

    pub fn failed(tool: ToolKind, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool,
            executed: false,
            output_summary: None,
            error: Some(error.into()),
        }
    }
}

/// 一次完整运行的轨迹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub plan: ResearchPlan,
    /// 与步骤顺序一致
    pub tools_executed: Vec<ToolExecution>,
    pub final_answer: String,
    pub execution_time_seconds: f64,
}

impl ExecutionTrace {
    /// 实际执行成功的工具，按执行顺序
    pub fn executed_tools(&self) -> Vec<ToolKind> {
        self.tools_executed
            .iter()
            .filter(|t| t.executed)
            .map(|t| t.tool_name)
            .collect()
    }

    pub fn was_executed(&self, tool: ToolKind) -> bool {
        self.tools_executed
            .iter()
            .any(|t| t.tool_name == tool && t.executed)
    }
}

/// 评估发现的问题（封闭枚举，学习器直接按变体分类，不解析文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// 必需的 web_search 未执行
    RequiredToolSkipped,
    /// 工具顺序错误（或根本没有执行任何工具）
    WrongSequence,
    /// 回答缺乏搜索数据支撑且未承认数据不足
    UnsupportedAnswer,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::RequiredToolSkipped => {
                write!(f, "Required tool '{}' was not executed", ToolKind::WebSearch)
            }
            IssueKind::WrongSequence => write!(
                f,
                "Tools were not called in the correct sequence ({} → {})",
                ToolKind::WebSearch,
                ToolKind::Summarize
            ),
            IssueKind::UnsupportedAnswer => f.write_str("Answer is not supported by search data"),
        }
    }
}

/// 对一次轨迹的评估结论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub passed: bool,
    /// 0、1/3、2/3、1 之一
    pub score: f64,
    pub required_tools_used: bool,
    pub correct_sequence_followed: bool,
    pub answer_supported_by_data: bool,
    pub feedback: String,
    #[serde(default)]
    pub issues: Vec<IssueKind>,
}

/// 错误类别（封闭集合），序列化为 TOOL_SKIPPED 等大写标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MistakeKind {
    ToolSkipped,
    WrongOrder,
    PrematureAnswer,
    UnsupportedClaim,
}

impl MistakeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MistakeKind::ToolSkipped => "TOOL_SKIPPED",
            MistakeKind::WrongOrder => "WRONG_ORDER",
            MistakeKind::PrematureAnswer => "PREMATURE_ANSWER",
            MistakeKind::UnsupportedClaim => "UNSUPPORTED_CLAIM",
        }
    }
}

impl fmt::Display for MistakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条错误记录；存储中每个类别只保留一条，重复出现时 frequency 递增
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mistake {
    pub mistake_type: MistakeKind,
    pub description: String,
    pub corrective_rule: String,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    pub timestamp: NaiveDateTime,
    pub question: String,
}

fn default_frequency() -> u32 {
    1
}

/// 规则作用阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePhase {
    Planning,
    Execution,
}

/// 从错误中提炼出的行为约束，注入规划 prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRule {
    pub rule_id: String,
    pub rule_text: String,
    pub applies_to: RulePhase,
    /// 1..=10，越大越靠前
    pub priority: u8,
}

/// 持久化的记忆快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub mistakes: Vec<Mistake>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub successful_runs: u64,
}

pub const SNAPSHOT_VERSION: &str = "1.0";

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self {
            mistakes: Vec::new(),
            version: default_version(),
            total_runs: 0,
            successful_runs: 0,
        }
    }
}

impl MemorySnapshot {
    pub fn run_stats(&self) -> RunStats {
        RunStats {
            total_runs: self.total_runs,
            successful_runs: self.successful_runs,
        }
    }
}

/// 运行计数（规划器据此选择 prompt 强度）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_runs: u64,
    pub successful_runs: u64,
}

/// 学习统计（派生指标）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    /// 百分比；total_runs 为 0 时为 0
    pub success_rate: f64,
    pub total_mistakes: usize,
    /// 频次达到阈值的错误类别数
    pub recurring_patterns: usize,
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// 摘要置信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// 摘要工具输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    /// 3-5 条最重要的事实
    pub key_points: Vec<String>,
    /// 主题
    pub main_topic: String,
    /// 对摘要的信心：high / medium / low
    pub confidence: Confidence,
}

impl Summary {
    /// 解析失败时的兜底摘要
    pub fn fallback(context: &str) -> Self {
        Self {
            key_points: vec!["Summarization failed - using raw text".to_string()],
            main_topic: context.to_string(),
            confidence: Confidence::Low,
        }
    }
}

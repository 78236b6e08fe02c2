//! Planner：为问题生成分步研究计划
//!
//! prompt 强度随历史运行次数递增（运行次数由调用方传入）：
//! - `< 2` 次：极简，几乎不提工具
//! - `< 4` 次：提到工具但不强制，附带已学到的规则
//! - 其余：列出工具、规则与计划 JSON Schema，要求 3-5 步
//!
//! 只调用一次 LLM，不重试；调用失败、JSON 无法解析或步骤为空时返回单步兜底计划。

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::{AgentError, LearningRule, ResearchPlan, RulePhase, RunStats, ToolKind};
use crate::llm::{strip_code_fences, CompletionOptions, LlmClient, Message};
use crate::tools::{plan_schema_json, ToolExecutor};

const SYSTEM_WITH_RULES: &str =
    "You are a research planning expert. Always return valid JSON. Follow learned constraints strictly.";
const SYSTEM_PLAIN: &str = "You are a helpful assistant. Return valid JSON.";

/// prompt 强度档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTier {
    Minimal,
    Guided,
    Strict,
}

impl PromptTier {
    pub fn for_runs(total_runs: u64) -> Self {
        match total_runs {
            0 | 1 => PromptTier::Minimal,
            2 | 3 => PromptTier::Guided,
            _ => PromptTier::Strict,
        }
    }
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    options: CompletionOptions,
    rules: Vec<LearningRule>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, options: CompletionOptions) -> Self {
        Self {
            llm,
            options,
            rules: Vec::new(),
        }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, cfg: &LlmSection) -> Self {
        Self::new(llm, CompletionOptions::new(cfg.temperature, cfg.max_tokens))
    }

    /// 整体替换当前规则，只保留规划阶段的
    pub fn inject_learning(&mut self, rules: Vec<LearningRule>) {
        self.rules = rules
            .into_iter()
            .filter(|r| r.applies_to == RulePhase::Planning)
            .collect();
    }

    pub fn rules(&self) -> &[LearningRule] {
        &self.rules
    }

    pub async fn create_plan(&self, question: &str, stats: RunStats) -> ResearchPlan {
        self.plan_with_rules(question, &self.rules, stats).await
    }

    /// 用给定规则生成计划（非规划阶段的规则被忽略）；任何失败都退回兜底计划
    pub async fn plan_with_rules(
        &self,
        question: &str,
        rules: &[LearningRule],
        stats: RunStats,
    ) -> ResearchPlan {
        let rules: Vec<LearningRule> = rules
            .iter()
            .filter(|r| r.applies_to == RulePhase::Planning)
            .cloned()
            .collect();
        let tier = PromptTier::for_runs(stats.total_runs);
        tracing::info!(?tier, rules = rules.len(), model = self.llm.model(), "planning");

        match self.request_plan(question, &rules, tier).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "planning failed, using fallback plan");
                ResearchPlan::fallback(question)
            }
        }
    }

    async fn request_plan(
        &self,
        question: &str,
        rules: &[LearningRule],
        tier: PromptTier,
    ) -> Result<ResearchPlan, AgentError> {
        let system = if rules.is_empty() {
            SYSTEM_PLAIN
        } else {
            SYSTEM_WITH_RULES
        };
        let messages = vec![
            Message::system(system),
            Message::user(build_prompt(question, rules, tier)),
        ];

        let output = self.llm.complete(&messages, self.options).await?;
        parse_plan(&output, question)
    }
}

/// 解析计划 JSON：补齐问题、规范化步骤；步骤为空视为失败
pub fn parse_plan(output: &str, question: &str) -> Result<ResearchPlan, AgentError> {
    let mut plan: ResearchPlan = serde_json::from_str(strip_code_fences(output))
        .map_err(|e| AgentError::JsonParse(e.to_string()))?;
    if plan.steps.is_empty() {
        return Err(AgentError::JsonParse("plan has no steps".to_string()));
    }
    if plan.question.trim().is_empty() {
        plan.question = question.to_string();
    }
    plan.normalize();
    Ok(plan)
}

/// 规则按优先级降序排列的约束段落；无规则时为空串
fn constraints_block(rules: &[LearningRule]) -> String {
    if rules.is_empty() {
        return String::new();
    }
    let mut sorted: Vec<&LearningRule> = rules.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut block = String::from("LEARNED CONSTRAINTS (follow these strictly):\n");
    for rule in sorted {
        block.push_str(&format!("- {}\n", rule.rule_text));
    }
    block
}

pub fn build_prompt(question: &str, rules: &[LearningRule], tier: PromptTier) -> String {
    let constraints = constraints_block(rules);
    match tier {
        PromptTier::Minimal => format!(
            r#"Question: {question}

You likely know this already. Create a quick 1-step plan.

Return JSON: {{"question": "{question}", "steps": [{{"step_number": 1, "description": "answer", "tool_required": null, "reasoning": "know it"}}], "estimated_time": "instant"}}"#
        ),
        PromptTier::Guided => format!(
            r#"Question: {question}

Create a plan. You can use {search} or {summarize} if needed, or answer directly.

{constraints}
Return JSON: {{"question": "{question}", "steps": [{{"step_number": 1, "description": "step", "tool_required": "tool or null", "reasoning": "why"}}], "estimated_time": "1 min"}}"#,
            search = ToolKind::WebSearch,
            summarize = ToolKind::Summarize,
        ),
        PromptTier::Strict => {
            let tools = ToolExecutor::catalog();
            let reminder = if rules.is_empty() {
                ""
            } else {
                "IMPORTANT: Follow the learned constraints above strictly.\n"
            };
            format!(
                r#"You are an expert research planning assistant.

TASK: Create a step-by-step plan to answer: "{question}"

AVAILABLE TOOLS:
{tools}
{constraints}
{reminder}
Return a JSON plan matching this JSON Schema:
{schema}

Create 3-5 steps. Return ONLY valid JSON."#,
                schema = plan_schema_json(),
            )
        }
    }
}

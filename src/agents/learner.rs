//! Learner：把失败评估转成错误记录，再把错误记录提炼为规划规则
//!
//! 分类直接按 IssueKind 变体进行；规则 id 由类别标签的 SHA-256 前 8 位生成，跨运行稳定。

use chrono::Local;
use sha2::{Digest, Sha256};

use crate::core::{
    EvaluationResult, ExecutionTrace, IssueKind, LearningRule, Mistake, MistakeKind, RulePhase,
    ToolKind,
};

/// 规则优先级上限
const MAX_PRIORITY: u32 = 10;
/// 基础优先级（在此之上加累计频次）
const BASE_PRIORITY: u32 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct Learner;

impl Learner {
    pub fn new() -> Self {
        Self
    }

    /// 为每个问题生成一条错误记录（顺序与 issues 一致）
    pub fn analyze_failure(
        &self,
        trace: &ExecutionTrace,
        evaluation: &EvaluationResult,
    ) -> Vec<Mistake> {
        let question = trace.plan.question.as_str();
        evaluation
            .issues
            .iter()
            .map(|issue| {
                let kind = match issue {
                    IssueKind::RequiredToolSkipped => MistakeKind::ToolSkipped,
                    IssueKind::WrongSequence => MistakeKind::WrongOrder,
                    IssueKind::UnsupportedAnswer if trace.was_executed(ToolKind::WebSearch) => {
                        MistakeKind::UnsupportedClaim
                    }
                    IssueKind::UnsupportedAnswer => MistakeKind::PrematureAnswer,
                };
                new_mistake(kind, question)
            })
            .collect()
    }

    /// 按类别分组：取时间戳最新的纠正文本，优先级随累计频次提升，按优先级降序返回
    pub fn generate_learning_rules(&self, mistakes: &[Mistake]) -> Vec<LearningRule> {
        // 保持类别首次出现的顺序，排序时同优先级不乱序
        let mut groups: Vec<(MistakeKind, Vec<&Mistake>)> = Vec::new();
        for m in mistakes {
            match groups.iter_mut().find(|(kind, _)| *kind == m.mistake_type) {
                Some((_, group)) => group.push(m),
                None => groups.push((m.mistake_type, vec![m])),
            }
        }

        let mut rules: Vec<LearningRule> = groups
            .into_iter()
            .filter_map(|(kind, group)| {
                let latest = group.iter().max_by_key(|m| m.timestamp)?;
                let frequency: u32 = group.iter().map(|m| m.frequency.max(1)).sum();
                let priority = BASE_PRIORITY.saturating_add(frequency).min(MAX_PRIORITY);
                Some(LearningRule {
                    rule_id: rule_id(kind),
                    rule_text: latest.corrective_rule.clone(),
                    applies_to: RulePhase::Planning,
                    priority: priority as u8,
                })
            })
            .collect();

        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }
}

fn new_mistake(kind: MistakeKind, question: &str) -> Mistake {
    let (description, corrective_rule) = match kind {
        MistakeKind::ToolSkipped => (
            format!("Failed to execute web_search for question: {question}"),
            "ALWAYS execute web_search before attempting to answer research questions",
        ),
        MistakeKind::WrongOrder => (
            format!("Tools executed in wrong order for: {question}"),
            "ALWAYS execute web_search BEFORE summarize",
        ),
        MistakeKind::PrematureAnswer => (
            format!("Answered without gathering data: {question}"),
            "NEVER answer research questions without first executing web_search",
        ),
        MistakeKind::UnsupportedClaim => (
            format!("Answer contradicts search data: {question}"),
            "ALWAYS base answers strictly on search results",
        ),
    };

    Mistake {
        mistake_type: kind,
        description,
        corrective_rule: corrective_rule.to_string(),
        frequency: 1,
        timestamp: Local::now().naive_local(),
        question: question.to_string(),
    }
}

/// 类别标签 SHA-256 的前 8 个十六进制字符
pub fn rule_id(kind: MistakeKind) -> String {
    let digest = Sha256::digest(kind.as_str().as_bytes());
    digest
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlanStep, ResearchPlan, ToolExecution};
    use chrono::Duration;

    fn trace(tools: Vec<ToolExecution>) -> ExecutionTrace {
        ExecutionTrace {
            plan: ResearchPlan {
                question: "Who wrote Dune?".into(),
                steps: vec![PlanStep {
                    step_number: 1,
                    description: "answer".into(),
                    tool_required: None,
                    reasoning: String::new(),
                }],
                estimated_time: "instant".into(),
            },
            tools_executed: tools,
            final_answer: "Frank Herbert".into(),
            execution_time_seconds: 0.1,
        }
    }

    fn evaluation(issues: Vec<IssueKind>) -> EvaluationResult {
        EvaluationResult {
            passed: false,
            score: 0.0,
            required_tools_used: false,
            correct_sequence_followed: false,
            answer_supported_by_data: false,
            feedback: String::new(),
            issues,
        }
    }

    #[test]
    fn test_three_issues_without_search() {
        let mistakes = Learner.analyze_failure(
            &trace(Vec::new()),
            &evaluation(vec![
                IssueKind::RequiredToolSkipped,
                IssueKind::WrongSequence,
                IssueKind::UnsupportedAnswer,
            ]),
        );
        let kinds: Vec<_> = mistakes.iter().map(|m| m.mistake_type).collect();
        assert_eq!(
            kinds,
            vec![MistakeKind::ToolSkipped, MistakeKind::WrongOrder, MistakeKind::PrematureAnswer]
        );
        assert_eq!(mistakes[0].description, "Failed to execute web_search for question: Who wrote Dune?");
        assert!(mistakes.iter().all(|m| m.frequency == 1 && m.question == "Who wrote Dune?"));
    }

    #[test]
    fn test_unsupported_answer_after_search_is_claim() {
        let mistakes = Learner.analyze_failure(
            &trace(vec![ToolExecution::completed(ToolKind::WebSearch, "Found 3 results")]),
            &evaluation(vec![IssueKind::UnsupportedAnswer]),
        );
        assert_eq!(mistakes[0].mistake_type, MistakeKind::UnsupportedClaim);
        assert_eq!(mistakes[0].corrective_rule, "ALWAYS base answers strictly on search results");
    }

    #[test]
    fn test_rules_grouped_and_prioritised_by_frequency() {
        let t = trace(Vec::new());
        let mut older = new_mistake(MistakeKind::WrongOrder, "q");
        older.timestamp -= Duration::minutes(5);
        older.corrective_rule = "old text".into();
        let newer = new_mistake(MistakeKind::WrongOrder, "q");
        let mut skipped = Learner.analyze_failure(&t, &evaluation(vec![IssueKind::RequiredToolSkipped])).remove(0);
        skipped.frequency = 9;

        let rules = Learner.generate_learning_rules(&[older, skipped, newer]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].priority, 10);
        assert_eq!(rules[0].rule_id, rule_id(MistakeKind::ToolSkipped));
        assert_eq!(rules[1].priority, 5);
        assert_eq!(rules[1].rule_text, "ALWAYS execute web_search BEFORE summarize");
        assert!(rules.iter().all(|r| r.applies_to == RulePhase::Planning));
    }

    #[test]
    fn test_rule_id_is_stable_hex() {
        let id = rule_id(MistakeKind::ToolSkipped);
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, rule_id(MistakeKind::ToolSkipped));
        assert_ne!(id, rule_id(MistakeKind::WrongOrder));
    }

    #[test]
    fn test_no_mistakes_no_rules() {
        assert!(Learner.generate_learning_rules(&[]).is_empty());
    }
}

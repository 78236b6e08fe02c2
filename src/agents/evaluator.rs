//! Evaluator：对执行轨迹做三项确定性检查
//!
//! 1. 是否执行了 web_search
//! 2. 工具顺序是否正确（search 在 summarize 之前；没有执行任何工具视为不正确）
//! 3. 回答是否有数据支撑（未搜索时，只有坦承数据不足才算通过）
//!
//! 得分 = 通过项 / 3，至少两项通过即 passed。

use crate::config::{default_admission_phrases, EvaluationSection};
use crate::core::{EvaluationResult, ExecutionTrace, IssueKind, ToolKind};

/// 通过线（三项中至少两项）
const PASS_THRESHOLD: f64 = 0.66;

#[derive(Debug, Clone)]
pub struct Evaluator {
    admission_phrases: Vec<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(default_admission_phrases())
    }
}

impl Evaluator {
    pub fn new(admission_phrases: Vec<String>) -> Self {
        Self {
            admission_phrases: admission_phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(cfg: &EvaluationSection) -> Self {
        Self::new(cfg.admission_phrases.clone())
    }

    pub fn evaluate(&self, trace: &ExecutionTrace) -> EvaluationResult {
        let executed = trace.executed_tools();
        let mut issues = Vec::new();

        let required_tools_used = executed.contains(&ToolKind::WebSearch);
        if !required_tools_used {
            issues.push(IssueKind::RequiredToolSkipped);
        }

        let correct_sequence = check_sequence(&executed);
        if !correct_sequence {
            issues.push(IssueKind::WrongSequence);
        }

        let answer_supported = required_tools_used || self.admits_lack_of_data(&trace.final_answer);
        if !answer_supported {
            issues.push(IssueKind::UnsupportedAnswer);
        }

        let checks_passed = [required_tools_used, correct_sequence, answer_supported]
            .iter()
            .filter(|c| **c)
            .count();
        let score = checks_passed as f64 / 3.0;

        EvaluationResult {
            passed: score >= PASS_THRESHOLD,
            score,
            required_tools_used,
            correct_sequence_followed: correct_sequence,
            answer_supported_by_data: answer_supported,
            feedback: feedback(&executed, &issues, score),
            issues,
        }
    }

    fn admits_lack_of_data(&self, answer: &str) -> bool {
        let answer = answer.to_lowercase();
        self.admission_phrases
            .iter()
            .any(|p| answer.contains(p.as_str()))
    }
}

/// 只看每个工具首次成功执行的位置
fn check_sequence(executed: &[ToolKind]) -> bool {
    let search = executed.iter().position(|t| *t == ToolKind::WebSearch);
    let summarize = executed.iter().position(|t| *t == ToolKind::Summarize);
    match (search, summarize) {
        (Some(s), Some(m)) => s < m,
        (Some(_), None) => true,
        _ => false,
    }
}

fn breakdown(issues: &[IssueKind]) -> String {
    let mut out = String::from("Failure Breakdown:\n");
    for (i, issue) in issues.iter().enumerate() {
        out.push_str(&format!("   {}. {}\n", i + 1, issue));
    }
    out
}

fn feedback(executed: &[ToolKind], issues: &[IssueKind], score: f64) -> String {
    if issues.is_empty() {
        return "Excellent! All criteria met. Required tools used, correct sequence followed, and answer is supported by data.".to_string();
    }

    if score >= PASS_THRESHOLD {
        let text = format!("Acceptable but could improve.\n{}", breakdown(issues));
        return text.trim_end().to_string();
    }

    let mut text = format!("Failed evaluation.\n{}\nWhat went wrong:\n", breakdown(issues));
    if !executed.contains(&ToolKind::WebSearch) {
        text.push_str("   -> Did not search the web for information\n");
    }
    let search = executed.iter().position(|t| *t == ToolKind::WebSearch);
    let summarize = executed.iter().position(|t| *t == ToolKind::Summarize);
    if let (Some(s), Some(m)) = (search, summarize) {
        if s > m {
            text.push_str("   -> Tried to summarize before searching\n");
        }
    }
    if executed.is_empty() {
        text.push_str("   -> No tools were executed at all\n");
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResearchPlan, ToolExecution};

    fn trace(tools: Vec<ToolExecution>, answer: &str) -> ExecutionTrace {
        ExecutionTrace {
            plan: ResearchPlan::fallback("q"),
            tools_executed: tools,
            final_answer: answer.into(),
            execution_time_seconds: 0.0,
        }
    }

    fn done(tool: ToolKind) -> ToolExecution {
        ToolExecution::completed(tool, "ok")
    }

    #[test]
    fn test_search_then_summarize_scores_full() {
        let r = Evaluator::default().evaluate(&trace(
            vec![done(ToolKind::WebSearch), done(ToolKind::Summarize)],
            "Paris.",
        ));
        assert!(r.passed);
        assert_eq!(r.score, 1.0);
        assert!(r.issues.is_empty());
        assert!(r.feedback.starts_with("Excellent!"));
    }

    #[test]
    fn test_no_tools_and_made_up_answer_scores_zero() {
        let r = Evaluator::default().evaluate(&trace(Vec::new(), "The capital is Paris."));
        assert!(!r.passed);
        assert_eq!(r.score, 0.0);
        assert_eq!(
            r.issues,
            vec![IssueKind::RequiredToolSkipped, IssueKind::WrongSequence, IssueKind::UnsupportedAnswer]
        );
        assert!(r.feedback.contains("No tools were executed at all"));
        assert!(r.feedback.contains("Did not search the web"));
    }

    #[test]
    fn test_honest_admission_counts_as_supported() {
        let r = Evaluator::default().evaluate(&trace(
            Vec::new(),
            "I Don't Have enough information to answer this question.",
        ));
        assert!(r.answer_supported_by_data);
        assert!(!r.passed);
        assert!((r.score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_before_search_still_passes_two_of_three() {
        let r = Evaluator::default().evaluate(&trace(
            vec![done(ToolKind::Summarize), done(ToolKind::WebSearch)],
            "Paris.",
        ));
        assert!(r.passed);
        assert_eq!(r.issues, vec![IssueKind::WrongSequence]);
        assert!(r.feedback.starts_with("Acceptable"));
        assert!(r.feedback.contains("1. Tools were not called in the correct sequence"));
    }

    #[test]
    fn test_skipped_tools_do_not_count() {
        let r = Evaluator::default().evaluate(&trace(
            vec![
                ToolExecution::skipped(ToolKind::WebSearch, "Skipped intentionally"),
                done(ToolKind::Summarize),
            ],
            "Paris.",
        ));
        assert!(!r.required_tools_used);
        assert!(!r.correct_sequence_followed);
    }

    #[test]
    fn test_custom_admission_phrases() {
        let eval = Evaluator::new(vec!["Not Sure".into()]);
        assert!(eval.evaluate(&trace(Vec::new(), "I'm not sure.")).answer_supported_by_data);
        assert!(!eval.evaluate(&trace(Vec::new(), "No data.")).answer_supported_by_data);
    }
}

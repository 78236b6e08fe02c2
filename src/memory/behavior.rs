//! 行为修正：把存储的错误转成可注入规划阶段的约束，并渲染成人类可读的提醒

use crate::agents::Learner;
use crate::core::{LearningRule, Mistake, RulePhase};

#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorModifier {
    learner: Learner,
}

impl BehaviorModifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 错误记录 → 学习规则；没有错误时不产生规则
    pub fn generate_constraints(&self, mistakes: &[Mistake]) -> Vec<LearningRule> {
        if mistakes.is_empty() {
            return Vec::new();
        }
        self.learner.generate_learning_rules(mistakes)
    }
}

/// 规划阶段规则的编号列表（按优先级降序）
pub fn planning_reminders(rules: &[LearningRule]) -> String {
    if rules.is_empty() {
        return "No learned constraints yet.".to_string();
    }

    let mut planning: Vec<&LearningRule> = rules
        .iter()
        .filter(|r| r.applies_to == RulePhase::Planning)
        .collect();
    if planning.is_empty() {
        return "No planning constraints yet.".to_string();
    }
    planning.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut out = String::from("Learned Constraints:\n");
    for (i, rule) in planning.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} (priority: {})\n",
            i + 1,
            rule.rule_text,
            rule.priority
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(text: &str, phase: RulePhase, priority: u8) -> LearningRule {
        LearningRule {
            rule_id: "abcd1234".into(),
            rule_text: text.into(),
            applies_to: phase,
            priority,
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(BehaviorModifier::new().generate_constraints(&[]).is_empty());
        assert_eq!(planning_reminders(&[]), "No learned constraints yet.");
        assert_eq!(
            planning_reminders(&[rule("x", RulePhase::Execution, 5)]),
            "No planning constraints yet."
        );
    }

    #[test]
    fn test_reminders_sorted_by_priority() {
        let text = planning_reminders(&[
            rule("low", RulePhase::Planning, 4),
            rule("skip me", RulePhase::Execution, 9),
            rule("high", RulePhase::Planning, 8),
        ]);
        assert_eq!(
            text,
            "Learned Constraints:\n1. high (priority: 8)\n2. low (priority: 4)\n"
        );
    }
}

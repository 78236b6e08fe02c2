//! 终端展示：运行结果、学习统计、存储的错误（owo-colors 着色）
//!
//! 与日志分离：这里只负责给人看的输出，诊断信息走 tracing。

use owo_colors::OwoColorize;

use crate::core::{LearningStats, Mistake, ResearchOutcome};

const SEP: &str = "======================================================================";

pub fn print_banner(title: &str) {
    println!();
    println!("{}", SEP.magenta());
    println!("{}", title.magenta().bold());
    println!("{}", SEP.magenta());
}

pub fn print_outcome(outcome: &ResearchOutcome) {
    println!();
    println!("{}", SEP.cyan());
    println!("{} {}", "RESEARCH QUESTION:".green().bold(), outcome.question);
    println!("{}", SEP.cyan());

    println!();
    println!("{}", "STEP 1: PLANNING".yellow().bold());
    if outcome.rules_applied > 0 {
        println!("  ({} learned rule(s) applied)", outcome.rules_applied);
    }
    println!("Plan created with {} steps:", outcome.plan.steps.len());
    for step in &outcome.plan.steps {
        let tool = match step.tool_required.as_deref() {
            Some(t) if step.tool().is_some() => format!("[{t}]"),
            _ => "[no tool]".to_string(),
        };
        println!("  {}. {} {}", step.step_number, step.description, tool.blue());
    }

    println!();
    println!("{}", "STEP 2: EXECUTION".yellow().bold());
    for t in &outcome.trace.tools_executed {
        let detail = t
            .error
            .as_deref()
            .or(t.output_summary.as_deref())
            .unwrap_or_default();
        if t.executed {
            println!("  {} {}: {}", "✓".green(), t.tool_name, detail);
        } else if t.error.is_some() {
            println!("  {} {}: {}", "✗".red(), t.tool_name, detail);
        } else {
            println!("  {} {}: {}", "!".yellow(), t.tool_name, detail);
        }
    }
    println!("  ({:.1}s)", outcome.trace.execution_time_seconds);

    println!();
    println!("{}", "FINAL ANSWER:".green().bold());
    println!("{}", outcome.answer());

    let eval = &outcome.evaluation;
    println!();
    println!("{}", "STEP 3: EVALUATION".yellow().bold());
    if eval.passed {
        println!("{}", eval.feedback.green());
    } else {
        println!("{}", eval.feedback.red());
    }
    println!("Score: {:.1}%", eval.score * 100.0);
    println!("  Required tools used: {}", yes_no(eval.required_tools_used));
    println!("  Correct sequence:    {}", yes_no(eval.correct_sequence_followed));
    println!("  Answer supported:    {}", yes_no(eval.answer_supported_by_data));

    println!();
    if eval.passed {
        println!("{}", "No mistakes detected - execution was successful!".green());
    } else {
        println!("{}", "STEP 4: LEARNING FROM MISTAKES".yellow().bold());
        println!("Identified {} mistake(s):", outcome.mistakes.len());
        for m in &outcome.mistakes {
            println!("  • {}: {}", m.mistake_type.red(), m.description);
            println!("    -> Learning: {}", m.corrective_rule.green());
        }
        if outcome.learned {
            println!("{}", "Mistakes saved to memory".green());
        }
    }

    println!();
    println!("{}", "LEARNING PROGRESS:".cyan().bold());
    println!("   Total runs: {}", outcome.stats.total_runs);
    println!("   Success rate: {:.1}%", outcome.stats.success_rate);
    println!("   Patterns learned: {}", outcome.stats.recurring_patterns);
    println!("{}", SEP.cyan());
}

pub fn print_stats(stats: &LearningStats) {
    println!();
    println!("{}", "LEARNING STATISTICS".cyan().bold());
    println!("Total runs: {}", stats.total_runs);
    println!("Successful: {}", stats.successful_runs);
    println!("Failed: {}", stats.failed_runs);
    println!("Success rate: {:.1}%", stats.success_rate);
    println!("Total mistakes recorded: {}", stats.total_mistakes);
    println!("Recurring patterns: {}", stats.recurring_patterns);
    println!();
}

pub fn print_mistakes(mistakes: &[Mistake]) {
    println!("Mistakes in memory: {}", mistakes.len());
    println!();
    for m in mistakes {
        println!("  • {}", m.mistake_type.red());
        println!("    Rule: {}", m.corrective_rule);
        println!("    Frequency: {}", m.frequency);
        println!();
    }
}

fn yes_no(ok: bool) -> String {
    if ok {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

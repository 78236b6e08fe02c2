//! 学习过程演示：清空记忆 → 高错误率跑两题 → 展示学到的错误 → 低错误率再跑一题 → 最终统计
//!
//! 仅在 stdin 是终端时等待回车，管道 / CI 中直接跑完。

use std::io::{self, BufRead, IsTerminal, Write};

use owo_colors::OwoColorize;

use crate::config::AppConfig;
use crate::core::{AgentError, ResearchAgent};
use crate::memory::MistakeStore;
use crate::report;

pub const DEMO_QUESTIONS: [&str; 3] = [
    "What is the capital of France?",
    "What is the population of Tokyo?",
    "Who invented the telephone?",
];

/// 第一阶段的故障注入概率
const INITIAL_MISTAKE_RATE: f64 = 0.7;
/// 学习后的故障注入概率
const IMPROVED_MISTAKE_RATE: f64 = 0.2;

pub async fn run_demo(cfg: &AppConfig) -> Result<(), AgentError> {
    report::print_banner("SELF-IMPROVING AGENT DEMONSTRATION");
    println!();
    println!("This demo shows how the agent learns from mistakes.");
    println!();
    println!("{} Agent will make mistakes (high error rate)", "Phase 1:".yellow());
    println!("{} Agent learns from failures", "Phase 2:".yellow());
    println!("{} Agent performs better (lower error rate)", "Phase 3:".yellow());
    pause("Press Enter to start...");

    let store = MistakeStore::from_config(cfg);
    store.clear();

    report::print_banner("PHASE 1: INITIAL RUNS (Making Mistakes)");
    let mut first = ResearchAgent::new(cfg, INITIAL_MISTAKE_RATE)?;
    for question in &DEMO_QUESTIONS[..2] {
        let outcome = first.research(question).await;
        report::print_outcome(&outcome);
        pause("Press Enter to continue...");
    }

    report::print_banner("LEARNING PHASE");
    println!();
    report::print_mistakes(&store.load().mistakes);
    pause("Press Enter to see improved performance...");

    report::print_banner("PHASE 3: IMPROVED RUNS (Learning Applied)");
    let mut second = ResearchAgent::new(cfg, IMPROVED_MISTAKE_RATE)?;
    for question in &DEMO_QUESTIONS[2..] {
        let outcome = second.research(question).await;
        report::print_outcome(&outcome);
        pause("Press Enter to continue...");
    }

    report::print_banner("FINAL STATISTICS");
    let stats = store.get_stats();
    println!();
    println!("Total runs: {}", stats.total_runs);
    println!(
        "Success rate: {}",
        format!("{:.1}%", stats.success_rate).green()
    );
    println!("Patterns learned: {}", stats.recurring_patterns);
    println!();
    println!(
        "{}",
        "Demo complete! The agent has learned from its mistakes.".green()
    );
    Ok(())
}

fn pause(prompt: &str) {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return;
    }
    print!("\n{} ", prompt.cyan());
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = stdin.lock().read_line(&mut line);
}

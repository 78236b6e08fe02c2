//! Scout - 自我改进研究智能体
//!
//! 入口：加载 .env 与配置、初始化日志，按参数执行单次研究 / 演示 / 清空记忆 / 查看统计。

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;

use scout::config::load_config;
use scout::core::{AgentError, ResearchAgent};
use scout::memory::MistakeStore;
use scout::{demo, observability, report};

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Self-improving research agent: plans, searches, evaluates itself and learns from mistakes", long_about = None)]
#[command(version)]
struct Cli {
    /// Research question to answer
    question: Option<String>,

    /// Run the demonstration showing learning progression
    #[arg(long)]
    demo: bool,

    /// Clear all learned mistakes and run counters
    #[arg(long)]
    clear_memory: bool,

    /// Show learning statistics
    #[arg(long)]
    stats: bool,

    /// Probability of making mistakes (0.0-1.0, for demonstration)
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    mistake_rate: f64,

    /// Extra config file layered over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{p} is not in 0.0..=1.0"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    observability::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;

    if cli.clear_memory {
        MistakeStore::from_config(&cfg).clear();
        println!("{}", "Memory cleared".green());
        return Ok(());
    }

    if cli.stats {
        report::print_stats(&MistakeStore::from_config(&cfg).get_stats());
        return Ok(());
    }

    let result = if cli.demo {
        demo::run_demo(&cfg).await
    } else if let Some(question) = cli.question.as_deref() {
        run_question(&cfg, question, cli.mistake_rate).await
    } else {
        Cli::command().print_help().context("Failed to print help")?;
        return Ok(());
    };

    match result {
        Ok(()) => Ok(()),
        Err(AgentError::Config(msg)) => {
            eprintln!("{} {}", "ERROR:".red().bold(), msg);
            eprintln!(
                "{}",
                "Set the key in your environment or .env, or run with SCOUT__LLM__PROVIDER=mock".yellow()
            );
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_question(
    cfg: &scout::config::AppConfig,
    question: &str,
    mistake_rate: f64,
) -> Result<(), AgentError> {
    let mut agent = ResearchAgent::new(cfg, mistake_rate)?;
    let outcome = agent.research(question).await;
    report::print_outcome(&outcome);
    Ok(())
}

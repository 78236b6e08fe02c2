//! 研究循环：规划 → 执行 → 评估 → （失败时）学习 → 更新统计
//!
//! ResearchAgent 持有四个角色与错误存储。每次运行前从存储重新生成规则并注入 Planner，
//! 运行次数作为显式输入传给 Planner 选择 prompt 档位。

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{Evaluator, FaultInjector, Learner, Planner, ResearchExecutor};
use crate::config::AppConfig;
use crate::core::{
    AgentError, EvaluationResult, ExecutionTrace, LearningStats, Mistake, ResearchPlan,
};
use crate::llm::{create_groq_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{BehaviorModifier, MistakeStore};
use crate::tools::{DuckDuckGoSearch, LlmSummarizer, ToolExecutor};

/// 自由文本回答与结构化输出分别使用的客户端
pub struct LlmClients {
    pub chat: Arc<dyn LlmClient>,
    pub structured: Arc<dyn LlmClient>,
}

/// 按 provider 创建 LLM 客户端；缺少凭据或 provider 未知时返回 Config 错误
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<LlmClients, AgentError> {
    let llm = &cfg.llm;
    let provider = llm.provider.trim().to_lowercase();

    match provider.as_str() {
        "groq" => {
            let key = require_env("GROQ_API_KEY", "https://console.groq.com/keys")?;
            tracing::info!(model = %llm.model, structured = %llm.structured_model, "Using Groq LLM");
            let base = llm.base_url.as_deref();
            Ok(LlmClients {
                chat: Arc::new(create_groq_client(&key, &llm.model, base)),
                structured: Arc::new(create_groq_client(&key, &llm.structured_model, base)),
            })
        }
        "openai" => {
            let key = require_env("OPENAI_API_KEY", "https://platform.openai.com/api-keys")?;
            tracing::info!(model = %llm.model, structured = %llm.structured_model, "Using OpenAI LLM");
            let base = llm.base_url.as_deref();
            Ok(LlmClients {
                chat: Arc::new(OpenAiClient::new(base, &llm.model, &key)),
                structured: Arc::new(OpenAiClient::new(base, &llm.structured_model, &key)),
            })
        }
        "mock" => {
            tracing::warn!("Using Mock LLM");
            Ok(LlmClients {
                chat: Arc::new(MockLlmClient),
                structured: Arc::new(MockLlmClient),
            })
        }
        other => Err(AgentError::Config(format!(
            "unknown llm provider '{other}' (expected groq, openai or mock)"
        ))),
    }
}

fn require_env(name: &str, hint: &str) -> Result<String, AgentError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AgentError::Config(format!(
            "{name} not found in environment. Add {name}=your_key_here to a .env file (get a key from {hint})"
        ))),
    }
}

/// 自动故障注入计划：仅在开启且未显式指定概率时生效。
/// 前 3 次运行 0.6，第 4、5 次 0.3，之后 0
pub fn scheduled_mistake_probability(requested: f64, auto: bool, total_runs: u64) -> f64 {
    if !auto || requested != 0.0 {
        return requested;
    }
    match total_runs {
        0..=2 => 0.6,
        3 | 4 => 0.3,
        _ => 0.0,
    }
}

/// 单次运行的完整结果
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// 日志关联用
    pub run_id: Uuid,
    pub question: String,
    /// 本次规划时生效的规则数
    pub rules_applied: usize,
    pub plan: ResearchPlan,
    pub trace: ExecutionTrace,
    pub evaluation: EvaluationResult,
    /// 本次新识别的错误（通过时为空）
    pub mistakes: Vec<Mistake>,
    /// 是否有错误写入存储
    pub learned: bool,
    /// 本次运行计入后的统计
    pub stats: LearningStats,
}

impl ResearchOutcome {
    pub fn answer(&self) -> &str {
        &self.trace.final_answer
    }

    pub fn passed(&self) -> bool {
        self.evaluation.passed
    }
}

pub struct ResearchAgent {
    planner: Planner,
    executor: ResearchExecutor,
    evaluator: Evaluator,
    learner: Learner,
    behavior: BehaviorModifier,
    store: MistakeStore,
}

impl ResearchAgent {
    /// 从配置装配：真实搜索（DuckDuckGo）+ 结构化模型摘要 + 按 provider 选择的 LLM
    pub fn new(cfg: &AppConfig, mistake_probability: f64) -> Result<Self, AgentError> {
        let llms = create_llm_from_config(cfg)?;
        let store = MistakeStore::from_config(cfg);

        let total_runs = store.load().total_runs;
        let probability = scheduled_mistake_probability(
            mistake_probability,
            cfg.learning.auto_mistake_schedule,
            total_runs,
        );
        if probability != mistake_probability {
            tracing::info!(run = total_runs + 1, probability, "learning mode: scheduled mistake probability");
        }

        let search = &cfg.tools.search;
        let tools = ToolExecutor::new(
            Arc::new(DuckDuckGoSearch::new(search.endpoint.clone(), search.timeout_secs)),
            Arc::new(LlmSummarizer::new(llms.structured.clone())),
            cfg.tools.tool_timeout_secs,
        );

        Ok(Self::with_components(
            Planner::from_config(llms.structured, &cfg.llm),
            ResearchExecutor::new(
                tools,
                llms.chat,
                search.max_results,
                FaultInjector::new(probability),
            ),
            Evaluator::from_config(&cfg.evaluation),
            store,
        ))
    }

    /// 用现成组件装配（测试中注入脚本化 LLM 与静态搜索）
    pub fn with_components(
        planner: Planner,
        executor: ResearchExecutor,
        evaluator: Evaluator,
        store: MistakeStore,
    ) -> Self {
        let mut agent = Self {
            planner,
            executor,
            evaluator,
            learner: Learner::new(),
            behavior: BehaviorModifier::new(),
            store,
        };
        agent.apply_learning();
        agent
    }

    pub fn store(&self) -> &MistakeStore {
        &self.store
    }

    pub fn mistake_probability(&self) -> f64 {
        self.executor.mistake_probability()
    }

    /// 从存储的错误生成规则并注入 Planner；返回生效的规则数
    pub fn apply_learning(&mut self) -> usize {
        let snapshot = self.store.load();
        let rules = self.behavior.generate_constraints(&snapshot.mistakes);
        if !rules.is_empty() {
            tracing::info!(
                mistakes = snapshot.mistakes.len(),
                rules = rules.len(),
                "applied learned rules to planner"
            );
        }
        self.planner.inject_learning(rules);
        self.planner.rules().len()
    }

    pub async fn research(&mut self, question: &str) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("research", %run_id);
        self.run(run_id, question).instrument(span).await
    }

    async fn run(&mut self, run_id: Uuid, question: &str) -> ResearchOutcome {
        let rules_applied = self.apply_learning();
        let run_stats = self.store.load().run_stats();

        tracing::info!(question, "planning");
        let plan = self.planner.create_plan(question, run_stats).await;

        tracing::info!(steps = plan.steps.len(), "executing");
        let trace = self.executor.execute_plan(&plan).await;

        let evaluation = self.evaluator.evaluate(&trace);
        tracing::info!(passed = evaluation.passed, score = evaluation.score, "evaluated");

        let mistakes = if evaluation.passed {
            Vec::new()
        } else {
            self.learner.analyze_failure(&trace, &evaluation)
        };
        let learned = !mistakes.is_empty();
        if learned {
            tracing::info!(count = mistakes.len(), "recording mistakes");
            self.store.add_mistakes(&mistakes);
        }

        self.store.update_stats(evaluation.passed);
        let stats = self.store.get_stats();

        ResearchOutcome {
            run_id,
            question: question.to_string(),
            rules_applied,
            plan,
            trace,
            evaluation,
            mistakes,
            learned,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_only_when_auto_and_unset() {
        assert_eq!(scheduled_mistake_probability(0.0, true, 0), 0.6);
        assert_eq!(scheduled_mistake_probability(0.0, true, 2), 0.6);
        assert_eq!(scheduled_mistake_probability(0.0, true, 3), 0.3);
        assert_eq!(scheduled_mistake_probability(0.0, true, 4), 0.3);
        assert_eq!(scheduled_mistake_probability(0.0, true, 5), 0.0);
        assert_eq!(scheduled_mistake_probability(0.7, true, 0), 0.7);
        assert_eq!(scheduled_mistake_probability(0.0, false, 0), 0.0);
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "Mock".into();
        let clients = create_llm_from_config(&cfg).unwrap();
        assert_eq!(clients.chat.model(), "mock");
        assert_eq!(clients.structured.model(), "mock");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "carrier-pigeon".into();
        assert!(matches!(create_llm_from_config(&cfg), Err(AgentError::Config(_))));
    }
}

//! Executor：按顺序执行计划步骤，调用搜索 / 摘要并生成最终回答
//!
//! 搜索结果累积为共享上下文，摘要与回答都基于它。协作者失败只记录为未执行的工具，
//! 不中断后续步骤。可按概率注入故障（跳过工具、无数据直接回答），用来演示学习过程。

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{ExecutionTrace, ResearchPlan, ToolExecution, ToolKind};
use crate::llm::{CompletionOptions, LlmClient, Message};
use crate::tools::{format_search_results, ToolExecutor};

const SKIPPED_INTENTIONALLY: &str = "Skipped intentionally";
const NO_DATA_TO_SUMMARIZE: &str = "No data to summarize";
const NO_SEARCH_DATA: &str = "No search data available";
const NO_INFO_ANSWER: &str = "I don't have enough information to answer this question.";
const SUMMARY_CONTEXT: &str = "search results";

const ANSWER_SYSTEM_PROMPT: &str = "You are a professional research assistant. Answer questions ONLY based on provided search data. Never fabricate information. Be precise, factual, and cite evidence from the data.";

/// 故障注入器：每次询问以给定概率返回 true
#[derive(Debug)]
pub struct FaultInjector {
    probability: f64,
    rng: StdRng,
}

impl FaultInjector {
    /// 概率截断到 [0, 1]；NaN 视为 0
    pub fn new(probability: f64) -> Self {
        Self::with_rng(probability, StdRng::from_entropy())
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(probability: f64, rng: StdRng) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability, rng }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn should_fire(&mut self) -> bool {
        self.probability > 0.0 && self.rng.gen::<f64>() < self.probability
    }
}

pub struct ResearchExecutor {
    tools: ToolExecutor,
    llm: Arc<dyn LlmClient>,
    max_results: usize,
    faults: FaultInjector,
}

impl ResearchExecutor {
    pub fn new(
        tools: ToolExecutor,
        llm: Arc<dyn LlmClient>,
        max_results: usize,
        faults: FaultInjector,
    ) -> Self {
        Self {
            tools,
            llm,
            max_results,
            faults,
        }
    }

    pub fn mistake_probability(&self) -> f64 {
        self.faults.probability()
    }

    pub async fn execute_plan(&mut self, plan: &ResearchPlan) -> ExecutionTrace {
        let start = Instant::now();
        let mut tools_executed = Vec::new();
        let mut context = String::new();

        tracing::info!(steps = plan.steps.len(), "executing plan");

        for step in &plan.steps {
            let Some(tool) = step.tool() else {
                tracing::debug!(step = step.step_number, "no tool required");
                continue;
            };

            let record = match tool {
                ToolKind::WebSearch => self.run_search(&plan.question, &mut context).await,
                ToolKind::Summarize => self.run_summarize(&context).await,
            };
            tracing::info!(
                step = step.step_number,
                tool = %tool,
                executed = record.executed,
                "step finished"
            );
            tools_executed.push(record);
        }

        let final_answer = self.generate_answer(&plan.question, &context).await;

        ExecutionTrace {
            plan: plan.clone(),
            tools_executed,
            final_answer,
            execution_time_seconds: start.elapsed().as_secs_f64(),
        }
    }

    async fn run_search(&mut self, question: &str, context: &mut String) -> ToolExecution {
        if self.faults.should_fire() {
            tracing::warn!("skipping web_search (fault injection)");
            return ToolExecution::skipped(ToolKind::WebSearch, SKIPPED_INTENTIONALLY);
        }

        match self.tools.search(question, self.max_results).await {
            Ok(results) => {
                // 空结果不写入 "No search results found."：上下文保持为空，
                // 后续 summarize 记为无数据，回答按无数据处理
                if !results.is_empty() {
                    if !context.is_empty() {
                        context.push('\n');
                    }
                    context.push_str(&format_search_results(&results));
                }
                ToolExecution::completed(
                    ToolKind::WebSearch,
                    format!("Found {} results", results.len()),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "web_search failed");
                ToolExecution::failed(ToolKind::WebSearch, e.to_string())
            }
        }
    }

    async fn run_summarize(&mut self, context: &str) -> ToolExecution {
        if self.faults.should_fire() {
            tracing::warn!("skipping summarize (fault injection)");
            return ToolExecution::skipped(ToolKind::Summarize, SKIPPED_INTENTIONALLY);
        }
        if context.is_empty() {
            return ToolExecution::skipped(ToolKind::Summarize, NO_DATA_TO_SUMMARIZE);
        }

        match self.tools.summarize(context, SUMMARY_CONTEXT).await {
            Ok(summary) => ToolExecution::completed(
                ToolKind::Summarize,
                format!("Extracted {} key points", summary.key_points.len()),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "summarize failed");
                ToolExecution::failed(ToolKind::Summarize, e.to_string())
            }
        }
    }

    async fn generate_answer(&mut self, question: &str, context: &str) -> String {
        if context.is_empty() && self.faults.should_fire() {
            tracing::warn!("answering without data (fault injection)");
            return self.answer_without_data(question).await;
        }

        tracing::debug!(model = self.llm.model(), grounded = !context.is_empty(), "generating answer");
        let data = if context.is_empty() {
            NO_SEARCH_DATA
        } else {
            context
        };
        let messages = vec![
            Message::system(ANSWER_SYSTEM_PROMPT),
            Message::user(grounded_prompt(question, data)),
        ];
        match self
            .llm
            .complete(&messages, CompletionOptions::new(0.5, 500))
            .await
        {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed");
                format!("Error generating answer: {e}")
            }
        }
    }

    async fn answer_without_data(&self, question: &str) -> String {
        let messages = vec![Message::user(format!(
            "Answer this question briefly: {question}"
        ))];
        match self
            .llm
            .complete(&messages, CompletionOptions::new(0.7, 200))
            .await
        {
            Ok(answer) => answer.trim().to_string(),
            Err(_) => NO_INFO_ANSWER.to_string(),
        }
    }
}

fn grounded_prompt(question: &str, data: &str) -> String {
    format!(
        r#"You are a professional research assistant. Your task is to provide a comprehensive, factual answer based STRICTLY on the provided search data.

RESEARCH QUESTION:
{question}

SEARCH DATA:
{data}

INSTRUCTIONS:
1. Answer ONLY based on the data provided above
2. Do NOT use prior knowledge or make assumptions
3. If data is insufficient, clearly state: "Based on the provided data, [limited info available]"
4. Structure your answer clearly and concisely
5. Cite key facts from the search results

Provide your evidence-based answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlanStep, SearchResult, Summary};
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::tools::{Summarizer, WebSearch};
    use async_trait::async_trait;

    struct StaticSearch(Result<Vec<SearchResult>, String>);

    #[async_trait]
    impl WebSearch for StaticSearch {
        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>, String> {
            self.0
                .clone()
                .map(|r| r.into_iter().take(limit).collect())
        }
    }

    struct FixedSummarizer;

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _text: &str, context: &str) -> Result<Summary, String> {
            let mut s = Summary::fallback(context);
            s.key_points = vec!["a".into(), "b".into()];
            Ok(s)
        }
    }

    fn hit(i: usize) -> SearchResult {
        SearchResult {
            title: format!("Result {i}"),
            snippet: "Paris is the capital of France.".into(),
            url: format!("https://example.org/{i}"),
        }
    }

    fn step(n: u32, tool: Option<&str>) -> PlanStep {
        PlanStep {
            step_number: n,
            description: format!("step {n}"),
            tool_required: tool.map(String::from),
            reasoning: String::new(),
        }
    }

    fn plan(tools: &[Option<&str>]) -> ResearchPlan {
        ResearchPlan {
            question: "What is the capital of France?".into(),
            steps: tools
                .iter()
                .enumerate()
                .map(|(i, t)| step(i as u32 + 1, *t))
                .collect(),
            estimated_time: "1 minute".into(),
        }
    }

    fn executor(
        search: Result<Vec<SearchResult>, String>,
        llm: Arc<ScriptedLlmClient>,
        probability: f64,
    ) -> ResearchExecutor {
        let tools = ToolExecutor::new(Arc::new(StaticSearch(search)), Arc::new(FixedSummarizer), 5);
        ResearchExecutor::new(tools, llm, 5, FaultInjector::seeded(probability, 7))
    }

    #[test]
    fn test_probability_is_clamped() {
        assert_eq!(FaultInjector::new(1.7).probability(), 1.0);
        assert_eq!(FaultInjector::new(-0.2).probability(), 0.0);
        assert_eq!(FaultInjector::new(f64::NAN).probability(), 0.0);
    }

    #[test]
    fn test_zero_never_fires_and_one_always_fires() {
        let mut never = FaultInjector::seeded(0.0, 1);
        let mut always = FaultInjector::seeded(1.0, 1);
        for _ in 0..100 {
            assert!(!never.should_fire());
            assert!(always.should_fire());
        }
    }

    #[tokio::test]
    async fn test_search_then_summarize_grounds_answer() {
        let llm = Arc::new(ScriptedLlmClient::new(["Paris."]));
        let mut exec = executor(Ok((0..8).map(hit).collect()), llm.clone(), 0.0);
        let trace = exec
            .execute_plan(&plan(&[Some("web_search"), Some("summarize"), None]))
            .await;

        assert_eq!(trace.executed_tools(), vec![ToolKind::WebSearch, ToolKind::Summarize]);
        assert_eq!(trace.tools_executed[0].output_summary.as_deref(), Some("Found 5 results"));
        assert_eq!(trace.tools_executed[1].output_summary.as_deref(), Some("Extracted 2 key points"));
        assert_eq!(trace.final_answer, "Paris.");

        let sent = &llm.received()[0];
        assert_eq!(sent[0].content, ANSWER_SYSTEM_PROMPT);
        assert!(sent[1].content.contains("Result 4"));
        assert!(!sent[1].content.contains("Result 5"));
    }

    #[tokio::test]
    async fn test_full_fault_injection_answers_without_data() {
        let llm = Arc::new(ScriptedLlmClient::new(["Probably Paris"]));
        let mut exec = executor(Ok(vec![hit(0)]), llm.clone(), 1.0);
        let trace = exec
            .execute_plan(&plan(&[Some("web_search"), Some("summarize")]))
            .await;

        assert!(trace.executed_tools().is_empty());
        assert!(trace
            .tools_executed
            .iter()
            .all(|t| t.output_summary.as_deref() == Some(SKIPPED_INTENTIONALLY)));
        assert_eq!(trace.final_answer, "Probably Paris");
        assert_eq!(llm.received()[0].len(), 1);
    }

    #[tokio::test]
    async fn test_ungrounded_failure_admits_lack_of_data() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let mut exec = executor(Ok(Vec::new()), llm, 1.0);
        let trace = exec.execute_plan(&plan(&[None])).await;
        assert_eq!(trace.final_answer, NO_INFO_ANSWER);
    }

    #[tokio::test]
    async fn test_search_error_is_recorded_and_execution_continues() {
        let llm = Arc::new(ScriptedLlmClient::new(["No data."]));
        let mut exec = executor(Err("connection refused".into()), llm.clone(), 0.0);
        let trace = exec
            .execute_plan(&plan(&[Some("web_search"), Some("summarize")]))
            .await;

        let search = &trace.tools_executed[0];
        assert!(!search.executed);
        assert!(search.error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(trace.tools_executed[1].output_summary.as_deref(), Some(NO_DATA_TO_SUMMARIZE));
        assert!(llm.received()[0][1].content.contains(NO_SEARCH_DATA));
    }

    #[tokio::test]
    async fn test_empty_results_do_not_create_context() {
        let llm = Arc::new(ScriptedLlmClient::new(["nothing"]));
        let mut exec = executor(Ok(Vec::new()), llm.clone(), 0.0);
        let trace = exec
            .execute_plan(&plan(&[Some("web_search"), Some("summarize")]))
            .await;

        assert!(trace.tools_executed[0].executed);
        assert_eq!(trace.tools_executed[0].output_summary.as_deref(), Some("Found 0 results"));
        assert!(!trace.tools_executed[1].executed);
        assert_eq!(
            trace.tools_executed[1].output_summary.as_deref(),
            Some(NO_DATA_TO_SUMMARIZE)
        );
        assert!(!llm.received()[0][1].content.contains("No search results found."));
    }

    #[tokio::test]
    async fn test_answer_failure_is_reported_in_answer() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push(Err(LlmError::Api("rate limited".into())));
        let mut exec = executor(Ok(vec![hit(0)]), llm, 0.0);
        let trace = exec.execute_plan(&plan(&[Some("web_search")])).await;
        assert!(trace.final_answer.starts_with("Error generating answer:"));
        assert!(trace.final_answer.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_noop() {
        let llm = Arc::new(ScriptedLlmClient::new(["ok"]));
        let mut exec = executor(Ok(vec![hit(0)]), llm, 0.0);
        let trace = exec.execute_plan(&plan(&[Some("calculator"), Some("null")])).await;
        assert!(trace.tools_executed.is_empty());
    }
}

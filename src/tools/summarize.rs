//! 摘要工具：调用结构化模型输出 JSON（key_points / main_topic / confidence）
//!
//! LLM 调用失败返回 Err（由执行器记为未执行）；输出无法解析时返回低置信度兜底摘要。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Summary;
use crate::llm::{strip_code_fences, CompletionOptions, LlmClient, Message};
use crate::tools::Summarizer;

const SYSTEM_PROMPT: &str = "You are a precise summarization assistant. Always return valid JSON.";

pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    options: CompletionOptions,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            options: CompletionOptions::new(0.3, 1024),
        }
    }

    fn prompt(text: &str, context: &str) -> String {
        format!(
            r#"Analyze and summarize the following {context}:

{text}

Extract:
1. Key points (3-5 most important facts)
2. Main topic
3. Your confidence in the summary (high/medium/low)

Return ONLY a JSON object with this structure:
{{
    "key_points": ["point 1", "point 2", ...],
    "main_topic": "main topic here",
    "confidence": "high/medium/low"
}}"#
        )
    }
}

/// 解析摘要 JSON；失败时返回兜底摘要
pub fn parse_summary(output: &str, context: &str) -> Summary {
    match serde_json::from_str::<Summary>(strip_code_fences(output)) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "summary output unparseable, using fallback");
            Summary::fallback(context)
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str, context: &str) -> Result<Summary, String> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(Self::prompt(text, context)),
        ];
        let output = self
            .llm
            .complete(&messages, self.options)
            .await
            .map_err(|e| e.to_string())?;
        Ok(parse_summary(&output, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Confidence;
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn test_parse_fenced_summary() {
        let raw = "```json\n{\"key_points\": [\"a\", \"b\"], \"main_topic\": \"t\", \"confidence\": \"high\"}\n```";
        let s = parse_summary(raw, "search results");
        assert_eq!(s.key_points.len(), 2);
        assert_eq!(s.confidence, Confidence::High);
    }

    #[test]
    fn test_garbage_falls_back_to_low_confidence() {
        let s = parse_summary("I cannot comply", "search results");
        assert_eq!(s, Summary::fallback("search results"));
        assert_eq!(s.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_call_failure_is_error() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let summarizer = LlmSummarizer::new(llm);
        assert!(summarizer.summarize("text", "search results").await.is_err());
    }
}

//! Mock LLM 客户端（离线运行与测试，无需 API）
//!
//! - MockLlmClient：按 prompt 内容返回固定的计划 / 摘要 / 回答，便于本地跑通完整流程
//! - ScriptedLlmClient：按队列依次返回预设结果，并记录收到的消息，供测试断言

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError, Message};

const MOCK_PLAN: &str = r#"{
  "question": "",
  "steps": [
    {"step_number": 1, "description": "Search the web for the question", "tool_required": "web_search", "reasoning": "Need external data"},
    {"step_number": 2, "description": "Summarize the search results", "tool_required": "summarize", "reasoning": "Extract key facts"},
    {"step_number": 3, "description": "Compose the final answer", "tool_required": null, "reasoning": "Answer from gathered data"}
  ],
  "estimated_time": "1 minute"
}"#;

const MOCK_SUMMARY: &str = r#"{"key_points": ["Mock key point"], "main_topic": "search results", "confidence": "medium"}"#;

/// Mock 客户端：识别规划 / 摘要请求并返回合法 JSON，其余请求返回保守回答
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let all = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if all.contains("\"key_points\"") {
            return Ok(MOCK_SUMMARY.to_string());
        }
        if all.contains("\"steps\"") {
            return Ok(MOCK_PLAN.to_string());
        }
        if all.contains("No search data available") {
            return Ok("I don't have enough information to answer this question.".to_string());
        }
        Ok("Based on the provided data, the search results answer the question (mock).".to_string())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// 脚本化客户端：依次弹出预设回复；队列耗尽后返回 Api 错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条回复（Ok 或 Err）
    pub fn push(&self, reply: Result<String, LlmError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// 已收到的全部请求（每次调用一组消息）
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _options: CompletionOptions,
    ) -> Result<String, LlmError> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_plan_for_planning_prompt() {
        let out = MockLlmClient
            .complete(
                &[Message::user("Return JSON with \"steps\": [...]")],
                CompletionOptions::new(0.7, 100),
            )
            .await
            .unwrap();
        assert!(out.contains("web_search"));
    }

    #[tokio::test]
    async fn test_scripted_pops_in_order_then_errors() {
        let llm = ScriptedLlmClient::new(["first", "second"]);
        let opts = CompletionOptions::new(0.0, 10);
        assert_eq!(llm.complete(&[Message::user("a")], opts).await.unwrap(), "first");
        assert_eq!(llm.complete(&[Message::user("b")], opts).await.unwrap(), "second");
        assert!(llm.complete(&[Message::user("c")], opts).await.is_err());
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.received()[1][0].content, "b");
    }
}

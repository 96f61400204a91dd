//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按脚本顺序弹出预置回复；脚本耗尽后固定返回 "yes"，
//! 使评估环节在离线模式下直接通过。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// Mock 客户端：预置回复队列，弹空后回 "yes"
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组按序返回的回复
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|_| "mock response queue poisoned".to_string())?;
        Ok(queue.pop_front().unwrap_or_else(|| "yes".to_string()))
    }
}

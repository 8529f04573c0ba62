//! Mock LLM 客户端（用于测试与演示，无需 API）
//!
//! 按顺序返回预先写好的回复；每次调用的消息都会被记录，便于断言 prompt 内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// 脚本化客户端：依次弹出回复，用完后返回错误
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条回复
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response.into());
        }
    }

    /// 已收到的调用（每次调用的完整消息列表）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.script
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .ok_or_else(|| "mock script exhausted".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_responses_in_order() {
        let llm = MockLlmClient::new(["first", "second"]);
        let msgs = vec![Message::user("hi")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "first");
        llm.push_response("third");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "second");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "third");
        assert!(llm.complete(&msgs).await.is_err());
        assert_eq!(llm.calls().len(), 4);
    }
}

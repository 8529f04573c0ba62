//! LLM 客户端抽象
//!
//! 三个角色（Planner / Executor / Replanner）的模型后端都实现 LlmClient；编排核心不依赖具体模型。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

//! Echo 工具（测试用）

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{RunContext, ToolError};
use crate::tools::{Tool, ToolOutput};

/// Echo 工具：回显文本
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text (for testing). Args: {\"text\": \"message\"}"
    }

    async fn execute(&self, _ctx: &RunContext, args: Value) -> Result<ToolOutput, ToolError> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("(empty)");
        Ok(ToolOutput::Done(serde_json::json!({ "text": text })))
    }
}

//! 人工澄清工具：调用时挂起 run，等待调用方在 Resume 时提供答案

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{RunContext, ToolError};
use crate::tools::{Tool, ToolOutput};

/// ask_for_clarification：向用户提问，答案通过 Resume 的补充输入注入
pub struct AskForClarificationTool;

impl AskForClarificationTool {
    fn suspend(question: &str) -> ToolOutput {
        ToolOutput::Suspend {
            reason: question.to_string(),
            state: json!({ "question": question }),
        }
    }
}

/// 补充输入可以是纯字符串，也可以是 {"answer": "..."}
fn answer_text(input: &Value) -> Option<String> {
    let text = match input {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => map
            .get("answer")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl Tool for AskForClarificationTool {
    fn name(&self) -> &str {
        "ask_for_clarification"
    }

    fn description(&self) -> &str {
        "Ask the user a question when required information is missing. Args: {\"question\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "Question to ask the user" }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, _ctx: &RunContext, args: Value) -> Result<ToolOutput, ToolError> {
        let question = args
            .get("question")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArgs {
                tool: self.name().to_string(),
                reason: "missing field `question`".to_string(),
            })?;
        Ok(Self::suspend(question))
    }

    async fn resume(&self, _ctx: &RunContext, state: Value, input: Value) -> Result<ToolOutput, ToolError> {
        let question = state
            .get("question")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match answer_text(&input) {
            Some(answer) => Ok(ToolOutput::Done(json!({
                "question": question,
                "answer": answer,
            }))),
            // 空答案：继续挂起，同一个问题
            None => Ok(Self::suspend(&question)),
        }
    }
}

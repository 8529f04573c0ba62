//! 强类型工具与 JSON Schema（schemars 自动生成）
//!
//! TypedTool 声明请求/响应类型；Typed 适配器负责把 JSON 参数反序列化为请求（即参数校验），
//! 并把响应序列化回 JSON。参数 schema 直接由请求类型生成，保证与实际校验一致。

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{RunContext, ToolError};
use crate::tools::{Tool, ToolOutput};

/// 强类型工具：请求 / 响应均带 JSON Schema
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Request: DeserializeOwned + JsonSchema + Send;
    type Response: Serialize + JsonSchema + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn call(&self, ctx: &RunContext, request: Self::Request)
        -> Result<Self::Response, ToolError>;
}

/// 把 TypedTool 适配为可注册的 Tool
pub struct Typed<T>(pub T);

#[async_trait]
impl<T> Tool for Typed<T>
where
    T: TypedTool + 'static,
{
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(T::Request)).unwrap_or(Value::Null)
    }

    async fn execute(&self, ctx: &RunContext, args: Value) -> Result<ToolOutput, ToolError> {
        let request: T::Request =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs {
                tool: T::NAME.to_string(),
                reason: e.to_string(),
            })?;
        let response = self.0.call(ctx, request).await?;
        serde_json::to_value(response)
            .map(ToolOutput::Done)
            .map_err(|e| ToolError::ExecutionFailed(format!("{}: {e}", T::NAME)))
    }
}

/// 响应类型的 JSON Schema
pub fn response_schema<T: TypedTool>() -> Value {
    serde_json::to_value(schema_for!(T::Response)).unwrap_or(Value::Null)
}

/// 工具调用请求格式：与 Executor 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 get_weather、search_flights
    pub tool: String,
    /// 工具参数，依工具不同而不同
    pub args: Value,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Serialize, JsonSchema)]
    struct AddResponse {
        sum: i64,
    }

    struct AddTool;

    #[async_trait]
    impl TypedTool for AddTool {
        type Request = AddRequest;
        type Response = AddResponse;

        const NAME: &'static str = "add";
        const DESCRIPTION: &'static str = "Add two integers";

        async fn call(&self, _ctx: &RunContext, req: AddRequest) -> Result<AddResponse, ToolError> {
            Ok(AddResponse { sum: req.a + req.b })
        }
    }

    #[tokio::test]
    async fn test_typed_tool_validates_and_serializes() {
        let tool = Typed(AddTool);
        let ctx = RunContext::new();
        let out = tool.execute(&ctx, json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(out, ToolOutput::Done(json!({"sum": 5})));

        let err = tool.execute(&ctx, json!({"a": "two"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { tool, .. } if tool == "add"));
    }

    #[test]
    fn test_parameters_schema_comes_from_request_type() {
        let schema = Typed(AddTool).parameters_schema();
        assert!(schema["properties"]["a"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("b")));
        assert!(response_schema::<AddTool>()["properties"]["sum"].is_object());
    }

    #[test]
    fn test_tool_call_schema_mentions_fields() {
        let s = tool_call_schema_json();
        assert!(s.contains("\"tool\""));
        assert!(s.contains("\"args\""));
    }
}

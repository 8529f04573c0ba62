//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute / resume），
//! 由 ToolRegistry 按名注册与查找，ToolExecutor 在调用时加超时并写审计日志。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{RunContext, ToolError};

/// 工具调用结果：完成，或需要外部输入而挂起
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Done(Value),
    /// state 原样存入断点，resume 时交还给同一个工具
    Suspend { reason: String, state: Value },
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认空对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, ctx: &RunContext, args: Value) -> Result<ToolOutput, ToolError>;

    /// 带外部输入继续一次挂起的调用；不支持挂起的工具保持默认实现
    async fn resume(
        &self,
        _ctx: &RunContext,
        _state: Value,
        _input: Value,
    ) -> Result<ToolOutput, ToolError> {
        Err(ToolError::ResumeUnsupported(self.name().to_string()))
    }
}

/// 工具注册表：按名称存储 Arc<dyn Tool>（有序，便于生成稳定的 prompt）
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名工具后注册者覆盖先注册者
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 动态生成工具 schema JSON，拼入 Executor 的 system prompt
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    #[test]
    fn test_resolve_unknown_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert!(registry.resolve("echo").is_ok());
        assert_eq!(
            registry.resolve("teleport").err(),
            Some(ToolError::ToolNotFound("teleport".into()))
        );
    }

    #[tokio::test]
    async fn test_default_resume_is_unsupported() {
        let ctx = RunContext::new();
        let err = EchoTool
            .resume(&ctx, Value::Null, Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::ResumeUnsupported("echo".into()));
    }

    #[test]
    fn test_schema_json_lists_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let schema: Value = serde_json::from_str(&registry.to_schema_json()).unwrap();
        assert_eq!(schema[0]["name"], "echo");
    }
}

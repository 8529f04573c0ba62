//! 工具执行器
//!
//! 持有 ToolRegistry 与单次调用超时，execute / resume 在超时内调用工具，
//! 超时转为 ToolError::Timeout；每次调用输出结构化审计日志（JSON）。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::{RunContext, ToolError};
use crate::observability::preview;
use crate::tools::{ToolOutput, ToolRegistry};

/// 工具执行器：对每次调用施加超时
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn execute(
        &self,
        ctx: &RunContext,
        tool_name: &str,
        args: Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self.registry.resolve(tool_name)?;
        let args_preview = preview(&args.to_string(), 200);
        self.audited(tool_name, "execute", args_preview, tool.execute(ctx, args))
            .await
    }

    /// 继续一次挂起的工具调用
    pub async fn resume(
        &self,
        ctx: &RunContext,
        tool_name: &str,
        state: Value,
        input: Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self.registry.resolve(tool_name)?;
        let input_preview = preview(&input.to_string(), 200);
        self.audited(tool_name, "resume", input_preview, tool.resume(ctx, state, input))
            .await
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    async fn audited<F>(
        &self,
        tool_name: &str,
        mode: &str,
        args_preview: String,
        call: F,
    ) -> Result<ToolOutput, ToolError>
    where
        F: Future<Output = Result<ToolOutput, ToolError>>,
    {
        let start = Instant::now();
        let result = timeout(self.timeout, call).await;

        let outcome = match &result {
            Ok(Ok(ToolOutput::Done(_))) => "ok",
            Ok(Ok(ToolOutput::Suspend { .. })) => "suspended",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "mode": mode,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(r) => r,
            Err(_) => Err(ToolError::Timeout(tool_name.to_string())),
        }
    }
}

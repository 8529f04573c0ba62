//! 编排过程事件：进度、工具调用、中断、完成、失败

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单条事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Agent 进度（计划生成、步骤结果、重规划决策等）
    Progress { agent: String, payload: Value },
    /// 调用工具
    ToolCall { name: String, args: Value },
    /// 工具返回
    ToolResult { name: String, result: Value },
    /// 挂起等待外部输入；resume_token 即断点 ID
    Interrupted { reason: String, resume_token: String },
    /// Replanner 给出最终结果
    Completed { output: String },
    /// Planning / Replanning 或持久化失败
    Failed { error: String },
}

impl AgentEvent {
    pub fn progress(agent: impl Into<String>, payload: Value) -> Self {
        Self::Progress {
            agent: agent.into(),
            payload,
        }
    }

    /// 终结当前流的事件：其后不会再有任何事件
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::Interrupted { .. } | AgentEvent::Completed { .. } | AgentEvent::Failed { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Progress { .. } => "progress",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Interrupted { .. } => "interrupted",
            AgentEvent::Completed { .. } => "completed",
            AgentEvent::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let ev = AgentEvent::Interrupted {
            reason: "need dates".into(),
            resume_token: "cp-1".into(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            v,
            json!({"type": "interrupted", "reason": "need dates", "resume_token": "cp-1"})
        );
    }

    #[test]
    fn test_terminal_events() {
        assert!(AgentEvent::Completed { output: "x".into() }.is_terminal());
        assert!(AgentEvent::Failed { error: "x".into() }.is_terminal());
        assert!(!AgentEvent::progress("planner", json!([])).is_terminal());
        assert!(!AgentEvent::ToolCall {
            name: "echo".into(),
            args: json!({})
        }
        .is_terminal());
    }
}

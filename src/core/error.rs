//! 错误分类
//!
//! - AgentError：Planner / Replanner / Executor 自身失败；Planner、Replanner 失败对整个 run 致命
//! - StepError：单步执行失败，记录到 StepResult，交给 Replanner 决策
//! - ToolError：工具解析、参数校验、执行、超时等错误，由 Executor 转成 StepError
//! - CheckpointError：断点存储失败（冲突 / 编解码 / 存储）
//! - RunError：面向调用方（Start / Resume）的错误

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::TransitionError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// 输出结构合法但语义不可用（如空计划）
    #[error("Invalid agent output: {0}")]
    InvalidOutput(String),

    /// 该角色不支持挂起（仅 Executor 可挂起）
    #[error("Agent '{0}' requested suspension, which is not supported in this phase")]
    UnsupportedSuspension(String),

    /// Resume 时收到的 continuation 不属于该 Agent
    #[error("Invalid continuation: {0}")]
    InvalidContinuation(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Step timeout after {0}s")]
    StepTimeout(u64),

    #[error("Cancelled")]
    Cancelled,
}

/// 单步失败：只记录，不终止 run
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("step '{step_id}' failed: {reason}")]
pub struct StepError {
    pub step_id: String,
    pub reason: String,
}

/// 工具层错误（传输级；领域级失败放在返回值的 error 字段中）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArgs { tool: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    Timeout(String),

    #[error("Tool '{0}' does not support resume")]
    ResumeUnsupported(String),
}

/// 断点存储错误：对当前操作总是致命
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// 冲突策略为 Reject 时，同一 ID 上已存在活动断点
    #[error("Checkpoint conflict: '{0}' already holds an active checkpoint")]
    Conflict(String),

    #[error("Checkpoint codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Checkpoint storage error: {0}")]
    Storage(String),
}

/// 面向调用方的错误
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("{phase} failed: {source}")]
    Agent {
        phase: &'static str,
        #[source]
        source: AgentError,
    },

    #[error("Replan limit exceeded after {0} rounds")]
    ReplanLimitExceeded(usize),

    /// 断点内容与计划不一致，或步骤状态迁移非法
    #[error("Invalid run state: {0}")]
    InvalidState(String),

    /// 调用方取消或截止时间到达；流正常结束，不产生 Failed 事件
    #[error("Stream cancelled")]
    StreamCancelled,
}

impl From<TransitionError> for RunError {
    fn from(e: TransitionError) -> Self {
        Self::InvalidState(e.to_string())
    }
}

impl RunError {
    pub fn planning(source: AgentError) -> Self {
        Self::Agent {
            phase: "Planning",
            source,
        }
    }

    pub fn replanning(source: AgentError) -> Self {
        Self::Agent {
            phase: "Replanning",
            source,
        }
    }
}

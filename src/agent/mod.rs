//! Agent 层：统一的调用契约与三个角色（Planner / Executor / Replanner）
//!
//! 三个角色共享 Agent trait，只在输入/输出类型上不同，Orchestrator 对它们一视同仁。
//! 挂起通过 AgentOutcome::Suspend 表达，携带的 Continuation 由 Orchestrator 原样保存、原样交还。

pub mod executor;
pub mod parse;
pub mod planner;
pub mod replanner;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AgentError, RunContext};
use crate::plan::{ExecutionResults, Plan, ReplanDecision, Step, StepResult};

pub use executor::{LlmExecutor, EXECUTOR_CONTINUATION_KIND};
pub use parse::{extract_json, parse_executor_action, ExecutorAction, ToolCall};
pub use planner::LlmPlanner;
pub use replanner::LlmReplanner;

/// 不透明的续接数据：kind 标识产生它的 Agent/Tool，data 只有它自己能解释
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub kind: String,
    pub data: Value,
}

impl Continuation {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// 挂起请求：原因（展示给调用方）+ 续接数据
#[derive(Debug, Clone, PartialEq)]
pub struct Suspension {
    pub reason: String,
    pub continuation: Continuation,
}

/// 一次 Agent 调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome<T> {
    Complete(T),
    Suspend(Suspension),
}

/// 统一的 Agent 契约
#[async_trait]
pub trait Agent: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// 用于事件与日志的角色名
    fn name(&self) -> &str;

    async fn run(
        &self,
        ctx: &RunContext,
        input: Self::Input,
    ) -> Result<AgentOutcome<Self::Output>, AgentError>;
}

/// Planner 输入：用户请求；Planner 只在 run 开始时调用一次
#[derive(Debug, Clone, Default)]
pub struct PlannerInput {
    pub request: String,
}

impl PlannerInput {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
        }
    }
}

/// Resume 时交给被挂起 Executor 的数据
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeData {
    pub continuation: Continuation,
    pub input: Value,
}

/// Executor 输入：当前步骤 + 已有结果（+ 恢复数据）
#[derive(Debug, Clone)]
pub struct ExecutorInput {
    pub request: String,
    pub step: Step,
    pub results: ExecutionResults,
    pub resume: Option<ResumeData>,
}

/// Replanner 输入：原始请求、当前计划、全部结果
#[derive(Debug, Clone)]
pub struct ReplannerInput {
    pub request: String,
    pub plan: Plan,
    pub results: ExecutionResults,
    /// 已完成的重规划轮数（从 0 开始）
    pub round: usize,
}

pub type DynPlanner = Arc<dyn Agent<Input = PlannerInput, Output = Plan>>;
pub type DynExecutor = Arc<dyn Agent<Input = ExecutorInput, Output = StepResult>>;
pub type DynReplanner = Arc<dyn Agent<Input = ReplannerInput, Output = ReplanDecision>>;

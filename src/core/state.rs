//! 运行状态：阶段机 + Orchestrator 独占的计划与结果
//!
//! RunState 只在生产者任务内被修改；挂起时整体写入 CheckPoint，Resume 时从中重建。

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::agent::Continuation;
use crate::checkpoint::{CheckPoint, CHECKPOINT_VERSION};
use crate::plan::{ExecutionResults, Plan, StepId};

/// Planning -> Executing -> Replanning -> {Executing | Terminated}，Executing 可进入 Suspended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Executing,
    Replanning,
    Suspended,
    Terminated,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Planning => "planning",
            RunPhase::Executing => "executing",
            RunPhase::Replanning => "replanning",
            RunPhase::Suspended => "suspended",
            RunPhase::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct RunState {
    pub checkpoint_id: String,
    pub request: String,
    pub plan: Plan,
    pub results: ExecutionResults,
    pub replan_rounds: usize,
    phase: RunPhase,
}

/// 从断点恢复时待续接的步骤
#[derive(Debug, Clone)]
pub struct SuspendedAt {
    pub step_id: StepId,
    pub continuation: Continuation,
}

impl RunState {
    pub fn new(checkpoint_id: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            checkpoint_id: checkpoint_id.into(),
            request: request.into(),
            plan: Plan::default(),
            results: ExecutionResults::new(),
            replan_rounds: 0,
            phase: RunPhase::Planning,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn enter(&mut self, phase: RunPhase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "run phase changed");
            self.phase = phase;
        }
    }

    /// 挂起快照：被挂起步骤保持 Running
    pub fn checkpoint(&self, suspended_step: &str, continuation: Continuation) -> CheckPoint {
        CheckPoint {
            version: CHECKPOINT_VERSION,
            checkpoint_id: self.checkpoint_id.clone(),
            request: self.request.clone(),
            plan: self.plan.clone(),
            results: self.results.clone(),
            suspended_step: suspended_step.to_string(),
            continuation,
            replan_rounds: self.replan_rounds,
            created_at: Utc::now(),
        }
    }

    pub fn from_checkpoint(checkpoint: CheckPoint) -> (Self, SuspendedAt) {
        let state = Self {
            checkpoint_id: checkpoint.checkpoint_id,
            request: checkpoint.request,
            plan: checkpoint.plan,
            results: checkpoint.results,
            replan_rounds: checkpoint.replan_rounds,
            phase: RunPhase::Executing,
        };
        let at = SuspendedAt {
            step_id: checkpoint.suspended_step,
            continuation: checkpoint.continuation,
        };
        (state, at)
    }
}

//! 断点快照：恢复一次挂起的 run 所需的全部状态
//!
//! 由 Orchestrator 编码为 JSON 字节交给 CheckpointStore；存储层从不解析它。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Continuation;
use crate::core::CheckpointError;
use crate::plan::{ExecutionResults, Plan, StepId};

/// 快照格式版本；结构不兼容时递增
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckPoint {
    pub version: u32,
    pub checkpoint_id: String,
    pub request: String,
    /// 挂起时的计划；被挂起步骤处于 Running
    pub plan: Plan,
    pub results: ExecutionResults,
    pub suspended_step: StepId,
    /// Executor 给出的续接数据，原样保存
    pub continuation: Continuation,
    pub replan_rounds: usize,
    pub created_at: DateTime<Utc>,
}

impl CheckPoint {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: CheckPoint = serde_json::from_slice(bytes)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::Storage(format!(
                "unsupported checkpoint version {}",
                checkpoint.version
            )));
        }
        Ok(checkpoint)
    }
}

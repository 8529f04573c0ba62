//! 计划数据模型
//!
//! Plan 由 Planner 生成、仅由 Orchestrator 修改、由 Executor 消费；
//! StepResult 一经产生不可变，按顺序追加到 ExecutionResults。

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::StepError;

pub type StepId = String;

/// 步骤状态：Pending -> Running -> Done | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl StepStatus {
    /// 已完成（成功或失败）的步骤不会再被执行，也不会被重规划修改
    pub fn is_finished(self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Failed)
    }

    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Running, StepStatus::Done)
                | (StepStatus::Running, StepStatus::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Done => write!(f, "done"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 计划中的单个步骤；id 在重规划之间保持稳定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub description: String,
    pub status: StepStatus,
}

impl Step {
    /// 新步骤，分配全新的 id
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), description)
    }

    pub fn with_id(id: impl Into<StepId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: StepStatus::Pending,
        }
    }
}

/// 有序步骤序列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

/// 非法的状态迁移（如对 Done 步骤再次标记 Running）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal transition for step '{step_id}': {from} -> {to}")]
pub struct TransitionError {
    pub step_id: StepId,
    pub from: StepStatus,
    pub to: StepStatus,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn from_descriptions<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(descriptions.into_iter().map(Step::new).collect())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// 按计划顺序的下一个 Pending 步骤
    pub fn next_pending(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .count()
    }

    /// 状态迁移只允许 Pending->Running->Done|Failed
    pub fn transition(&mut self, id: &str, next: StepStatus) -> Result<(), TransitionError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| TransitionError {
                step_id: id.to_string(),
                from: StepStatus::Pending,
                to: next,
            })?;
        if !step.status.can_transition_to(next) {
            return Err(TransitionError {
                step_id: id.to_string(),
                from: step.status,
                to: next,
            });
        }
        step.status = next;
        Ok(())
    }

    /// 合并 Replanner 给出的修订计划
    ///
    /// 已完成步骤原样保留在前；修订中与现有未完成步骤同 id 的保留 id（描述可更新），
    /// 其余视为新步骤，一律从 Pending 开始。修订中引用已完成步骤的条目被忽略。
    pub fn revise(&mut self, revision: Plan) {
        let finished: Vec<Step> = self
            .steps
            .iter()
            .filter(|s| s.status.is_finished())
            .cloned()
            .collect();
        let finished_ids: HashSet<StepId> = finished.iter().map(|s| s.id.clone()).collect();

        let mut seen = HashSet::new();
        let mut remaining = Vec::new();
        for mut step in revision.steps {
            if finished_ids.contains(&step.id) || !seen.insert(step.id.clone()) {
                continue;
            }
            step.status = StepStatus::Pending;
            remaining.push(step);
        }

        self.steps = finished;
        self.steps.extend(remaining);
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{}. [{}] {}", i + 1, step.status, step.description)?;
        }
        Ok(())
    }
}

/// Executor 对单个步骤的产出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub payload: Value,
    pub error: Option<StepError>,
}

impl StepResult {
    pub fn success(step: Step, payload: Value) -> Self {
        Self {
            step,
            payload,
            error: None,
        }
    }

    pub fn failure(step: Step, reason: impl Into<String>) -> Self {
        let error = StepError {
            step_id: step.id.clone(),
            reason: reason.into(),
        };
        Self {
            step,
            payload: Value::Null,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 按产生顺序排列的步骤结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionResults(Vec<StepResult>);

impl ExecutionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: StepResult) {
        self.0.push(result);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepResult> {
        self.0.iter()
    }

    pub fn for_step(&self, id: &str) -> Option<&StepResult> {
        self.0.iter().find(|r| r.step.id == id)
    }

    pub fn as_slice(&self) -> &[StepResult] {
        &self.0
    }
}

impl fmt::Display for ExecutionResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.0 {
            match &result.error {
                None => writeln!(f, "- {}: {}", result.step.description, result.payload)?,
                Some(err) => writeln!(f, "- {}: FAILED ({})", result.step.description, err.reason)?,
            }
        }
        Ok(())
    }
}

/// Replanner 决策：每轮重规划恰好消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplanDecision {
    Finalize { summary: String },
    ContinueWithPlan { plan: Plan },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_step(plan: &mut Plan, id: &str, status: StepStatus) {
        plan.transition(id, StepStatus::Running).unwrap();
        plan.transition(id, status).unwrap();
    }

    #[test]
    fn test_transition_rules() {
        let mut plan = Plan::new(vec![Step::with_id("a", "check weather")]);
        assert!(plan.transition("a", StepStatus::Done).is_err());
        plan.transition("a", StepStatus::Running).unwrap();
        plan.transition("a", StepStatus::Done).unwrap();
        let err = plan.transition("a", StepStatus::Running).unwrap_err();
        assert_eq!(err.from, StepStatus::Done);
        assert_eq!(
            err.to_string(),
            "illegal transition for step 'a': done -> running"
        );
        let as_error: &dyn std::error::Error = &err;
        assert!(as_error.source().is_none());
        assert!(plan.transition("missing", StepStatus::Running).is_err());
    }

    #[test]
    fn test_next_pending_follows_plan_order() {
        let mut plan = Plan::new(vec![
            Step::with_id("a", "one"),
            Step::with_id("b", "two"),
            Step::with_id("c", "three"),
        ]);
        run_step(&mut plan, "a", StepStatus::Failed);
        assert_eq!(plan.next_pending().map(|s| s.id.as_str()), Some("b"));
        assert_eq!(plan.pending_count(), 2);
    }

    #[test]
    fn test_revise_preserves_finished_steps() {
        let mut plan = Plan::new(vec![
            Step::with_id("a", "weather"),
            Step::with_id("b", "flights"),
            Step::with_id("c", "hotels"),
        ]);
        run_step(&mut plan, "a", StepStatus::Done);

        let mut tampered = Step::with_id("a", "rewritten");
        tampered.status = StepStatus::Pending;
        let revision = Plan::new(vec![
            tampered,
            Step::with_id("c", "hotels near the center"),
            Step::with_id("d", "attractions"),
            Step::with_id("c", "duplicate"),
        ]);
        plan.revise(revision);

        let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert_eq!(plan.steps[0].description, "weather");
        assert_eq!(plan.steps[0].status, StepStatus::Done);
        assert_eq!(plan.steps[1].description, "hotels near the center");
        assert_eq!(plan.steps[2].status, StepStatus::Pending);
    }

    #[test]
    fn test_revise_resets_status_of_new_steps() {
        let mut plan = Plan::default();
        let mut sneaky = Step::with_id("x", "pretend done");
        sneaky.status = StepStatus::Done;
        plan.revise(Plan::new(vec![sneaky]));
        assert_eq!(plan.steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn test_step_result_failure_carries_step_id() {
        let result = StepResult::failure(Step::with_id("s1", "book"), "no seats");
        assert!(!result.is_success());
        let err = result.error.unwrap();
        assert_eq!(err.step_id, "s1");
        assert_eq!(err.reason, "no seats");
    }

    #[test]
    fn test_replan_decision_wire_format() {
        let decision: ReplanDecision =
            serde_json::from_value(json!({"action": "finalize", "summary": "ok"})).unwrap();
        assert_eq!(
            decision,
            ReplanDecision::Finalize {
                summary: "ok".into()
            }
        );
    }
}

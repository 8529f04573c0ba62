//! Plan-Execute-Replan 编排器：主控循环
//!
//! start / resume 各自在后台任务中驱动一次 run，通过单槽事件流把进度推给调用方：
//! Planning 生成计划 -> Executing 按序执行 Pending 步骤 -> Replanning 决定结束或修订计划。
//! Executor 挂起时写入断点并推送 Interrupted，流随即结束；resume 从断点精确续接被挂起的步骤。
//! 取消（调用方、丢弃流、截止时间）与整个驱动循环竞争，生产者不会在取消后继续工作。

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::Instrument;

use crate::agent::{
    AgentOutcome, DynExecutor, DynPlanner, DynReplanner, ExecutorInput, PlannerInput,
    ReplannerInput, ResumeData,
};
use crate::checkpoint::{CheckPoint, CheckpointStore};
use crate::core::state::{RunPhase, RunState, SuspendedAt};
use crate::core::{AgentError, RunContext, RunError};
use crate::plan::{Plan, ReplanDecision, Step, StepResult, StepStatus};
use crate::stream::{event_channel, AgentEvent, EventStream};

pub const DEFAULT_MAX_REPLAN_ROUNDS: usize = 10;

/// 编排参数（对应配置的 [orchestrator] 段）
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Replanner 最多被调用的次数
    pub max_replan_rounds: usize,
    /// 步骤失败后跳过剩余步骤，直接进入 Replanning
    pub abort_on_step_error: bool,
    /// 单步 Executor 超时；超时记为步骤失败
    pub step_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_replan_rounds: DEFAULT_MAX_REPLAN_ROUNDS,
            abort_on_step_error: false,
            step_timeout: None,
        }
    }
}

/// start 的可选参数
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// 挂起时使用的断点 ID；未指定时自动生成
    pub checkpoint_id: Option<String>,
    pub ctx: Option<RunContext>,
}

impl StartOptions {
    pub fn with_checkpoint_id(mut self, id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(id.into());
        self
    }

    pub fn with_context(mut self, ctx: RunContext) -> Self {
        self.ctx = Some(ctx);
        self
    }
}

/// 一次 run 在本条流上的结局
enum RunEnd {
    Completed(String),
    Suspended(String),
}

/// 单步执行后的走向
enum StepFlow {
    Next,
    Replan,
    Suspended(String),
}

/// Plan-Execute-Replan 编排器；可克隆，内部组件共享
#[derive(Clone)]
pub struct PlanExecuteOrchestrator {
    planner: DynPlanner,
    executor: DynExecutor,
    replanner: DynReplanner,
    store: Arc<dyn CheckpointStore>,
    config: OrchestratorConfig,
}

impl PlanExecuteOrchestrator {
    pub fn new(
        planner: DynPlanner,
        executor: DynExecutor,
        replanner: DynReplanner,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            planner,
            executor,
            replanner,
            store,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// 开始一次新的 run；需在 tokio 运行时内调用
    pub fn start(&self, request: impl Into<String>, options: StartOptions) -> EventStream {
        let checkpoint_id = options
            .checkpoint_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let state = RunState::new(checkpoint_id, request);
        tracing::info!(checkpoint_id = %state.checkpoint_id, "run started");
        self.launch(options.ctx.unwrap_or_default(), state, None)
    }

    /// 从断点继续；断点在成功加载后即被消费，再次挂起会写入新的断点
    pub async fn resume(
        &self,
        checkpoint_id: &str,
        input: Value,
        ctx: Option<RunContext>,
    ) -> Result<EventStream, RunError> {
        let bytes = self
            .store
            .load(checkpoint_id)
            .await?
            .ok_or_else(|| RunError::CheckpointNotFound(checkpoint_id.to_string()))?;
        let checkpoint = CheckPoint::from_bytes(&bytes)?;
        let (state, at) = RunState::from_checkpoint(checkpoint);

        match state.plan.step(&at.step_id) {
            Some(step) if step.status == StepStatus::Running => {}
            _ => {
                return Err(RunError::InvalidState(format!(
                    "suspended step '{}' is not running in the saved plan",
                    at.step_id
                )))
            }
        }

        self.store.delete(checkpoint_id).await?;
        tracing::info!(checkpoint_id, step_id = %at.step_id, "run resumed");
        Ok(self.launch(ctx.unwrap_or_default(), state, Some((at, input))))
    }

    fn launch(
        &self,
        ctx: RunContext,
        state: RunState,
        resume: Option<(SuspendedAt, Value)>,
    ) -> EventStream {
        let token = ctx.cancel_token().child_token();
        let (sink, stream) = event_channel(token.clone(), state.checkpoint_id.clone());
        let run_ctx = ctx.for_run(token, sink);
        let span = run_ctx.span();
        let this = self.clone();
        tokio::spawn(async move { this.produce(run_ctx, state, resume).await }.instrument(span));
        stream
    }

    /// 生产者任务：驱动循环与取消、截止时间竞争，最后推送终结事件
    async fn produce(self, ctx: RunContext, mut state: RunState, resume: Option<(SuspendedAt, Value)>) {
        let token = ctx.cancel_token();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(RunError::StreamCancelled),
            _ = deadline_reached(ctx.deadline()) => Err(RunError::StreamCancelled),
            r = self.drive(&ctx, &mut state, resume) => r,
        };

        let terminal = match outcome {
            Ok(RunEnd::Completed(output)) => {
                state.enter(RunPhase::Terminated);
                tracing::info!(replan_rounds = state.replan_rounds, "run completed");
                AgentEvent::Completed { output }
            }
            Ok(RunEnd::Suspended(reason)) => {
                tracing::info!(checkpoint_id = %state.checkpoint_id, "run suspended");
                AgentEvent::Interrupted {
                    reason,
                    resume_token: state.checkpoint_id.clone(),
                }
            }
            Err(RunError::StreamCancelled) => {
                tracing::info!(phase = %state.phase(), "run cancelled");
                return;
            }
            Err(e) => {
                state.enter(RunPhase::Terminated);
                tracing::warn!(error = %e, "run failed");
                AgentEvent::Failed {
                    error: e.to_string(),
                }
            }
        };
        if ctx.emit(terminal).await.is_err() {
            tracing::debug!("terminal event dropped, consumer is gone");
        }
    }

    async fn drive(
        &self,
        ctx: &RunContext,
        state: &mut RunState,
        resume: Option<(SuspendedAt, Value)>,
    ) -> Result<RunEnd, RunError> {
        let mut replan_now = false;
        if let Some((at, input)) = resume {
            let step = state
                .plan
                .step(&at.step_id)
                .cloned()
                .ok_or_else(|| RunError::InvalidState(format!("unknown step '{}'", at.step_id)))?;
            let resume = ResumeData {
                continuation: at.continuation,
                input,
            };
            match self.execute_step(ctx, state, step, Some(resume)).await? {
                StepFlow::Suspended(reason) => return Ok(RunEnd::Suspended(reason)),
                StepFlow::Replan => replan_now = true,
                StepFlow::Next => {}
            }
        } else {
            self.plan(ctx, state).await?;
        }

        loop {
            if !replan_now {
                if let Some(reason) = self.execute_pending(ctx, state).await? {
                    return Ok(RunEnd::Suspended(reason));
                }
            }
            replan_now = false;
            if let ReplanDecision::Finalize { summary } = self.replan(ctx, state).await? {
                return Ok(RunEnd::Completed(summary));
            }
        }
    }

    async fn plan(&self, ctx: &RunContext, state: &mut RunState) -> Result<(), RunError> {
        state.enter(RunPhase::Planning);
        let input = PlannerInput::new(state.request.clone());
        let plan = match self.planner.run(ctx, input).await {
            Ok(AgentOutcome::Complete(plan)) => plan,
            Ok(AgentOutcome::Suspend(_)) => {
                return Err(RunError::planning(AgentError::UnsupportedSuspension(
                    self.planner.name().to_string(),
                )))
            }
            Err(e) => return Err(agent_failure(e, RunError::planning)),
        };
        // 与重规划同样处理：去重 id，状态一律重置为 Pending
        state.plan = Plan::default();
        state.plan.revise(plan);
        tracing::info!(steps = state.plan.len(), "plan created");
        emit(
            ctx,
            AgentEvent::progress(self.planner.name(), json!({ "steps": state.plan.steps })),
        )
        .await?;
        state.enter(RunPhase::Executing);
        Ok(())
    }

    /// 按序执行全部 Pending 步骤；挂起时返回原因
    async fn execute_pending(
        &self,
        ctx: &RunContext,
        state: &mut RunState,
    ) -> Result<Option<String>, RunError> {
        state.enter(RunPhase::Executing);
        while let Some(step) = state.plan.next_pending().cloned() {
            if ctx.is_cancelled() {
                return Err(RunError::StreamCancelled);
            }
            state.plan.transition(&step.id, StepStatus::Running)?;
            match self.execute_step(ctx, state, step, None).await? {
                StepFlow::Next => {}
                StepFlow::Replan => break,
                StepFlow::Suspended(reason) => return Ok(Some(reason)),
            }
        }
        Ok(None)
    }

    /// 执行一个已处于 Running 的步骤
    async fn execute_step(
        &self,
        ctx: &RunContext,
        state: &mut RunState,
        step: Step,
        resume: Option<ResumeData>,
    ) -> Result<StepFlow, RunError> {
        tracing::debug!(step_id = %step.id, description = %step.description, "step started");
        let input = ExecutorInput {
            request: state.request.clone(),
            step: step.clone(),
            results: state.results.clone(),
            resume,
        };
        let outcome = match self.config.step_timeout {
            Some(limit) => match timeout(limit, self.executor.run(ctx, input)).await {
                Ok(r) => r,
                Err(_) => Err(AgentError::StepTimeout(limit.as_secs())),
            },
            None => self.executor.run(ctx, input).await,
        };

        let mut result = match outcome {
            Ok(AgentOutcome::Complete(result)) => result,
            Ok(AgentOutcome::Suspend(suspension)) => {
                state.enter(RunPhase::Suspended);
                let checkpoint = state.checkpoint(&step.id, suspension.continuation);
                self.store
                    .save(&state.checkpoint_id, checkpoint.to_bytes()?)
                    .await?;
                return Ok(StepFlow::Suspended(suspension.reason));
            }
            Err(AgentError::Cancelled) => return Err(RunError::StreamCancelled),
            Err(e) => StepResult::failure(step.clone(), e.to_string()),
        };

        let status = if result.is_success() {
            StepStatus::Done
        } else {
            StepStatus::Failed
        };
        state.plan.transition(&step.id, status)?;
        result.step = state.plan.step(&step.id).cloned().unwrap_or(step);

        if let Some(err) = &result.error {
            tracing::warn!(step_id = %err.step_id, reason = %err.reason, "step failed");
        } else {
            tracing::debug!(step_id = %result.step.id, "step done");
        }
        let payload = serde_json::to_value(&result).unwrap_or(Value::Null);
        state.results.push(result);
        emit(ctx, AgentEvent::progress(self.executor.name(), payload)).await?;

        if status == StepStatus::Failed && self.config.abort_on_step_error {
            return Ok(StepFlow::Replan);
        }
        Ok(StepFlow::Next)
    }

    async fn replan(
        &self,
        ctx: &RunContext,
        state: &mut RunState,
    ) -> Result<ReplanDecision, RunError> {
        state.enter(RunPhase::Replanning);
        if state.replan_rounds >= self.config.max_replan_rounds {
            return Err(RunError::ReplanLimitExceeded(state.replan_rounds));
        }
        let input = ReplannerInput {
            request: state.request.clone(),
            plan: state.plan.clone(),
            results: state.results.clone(),
            round: state.replan_rounds,
        };
        let decision = match self.replanner.run(ctx, input).await {
            Ok(AgentOutcome::Complete(decision)) => decision,
            Ok(AgentOutcome::Suspend(_)) => {
                return Err(RunError::replanning(AgentError::UnsupportedSuspension(
                    self.replanner.name().to_string(),
                )))
            }
            Err(e) => return Err(agent_failure(e, RunError::replanning)),
        };
        state.replan_rounds += 1;

        if let ReplanDecision::ContinueWithPlan { plan } = &decision {
            state.plan.revise(plan.clone());
            tracing::info!(
                round = state.replan_rounds,
                pending = state.plan.pending_count(),
                "plan revised"
            );
            emit(
                ctx,
                AgentEvent::progress(self.replanner.name(), json!({ "steps": state.plan.steps })),
            )
            .await?;
        }
        Ok(decision)
    }
}

/// 取消类错误按正常结束处理，其余归入对应阶段
fn agent_failure(e: AgentError, phase: fn(AgentError) -> RunError) -> RunError {
    match e {
        AgentError::Cancelled => RunError::StreamCancelled,
        e => phase(e),
    }
}

async fn emit(ctx: &RunContext, event: AgentEvent) -> Result<(), RunError> {
    ctx.emit(event).await.map_err(|_| RunError::StreamCancelled)
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

//! Run 上下文：取消、截止时间、事件出口、追踪作用域
//!
//! 由调用方创建并传入 Start / Resume；每次 run 从中派生子令牌，
//! 因此丢弃某个 EventStream 只会取消那一次 run，不影响同一上下文上的后续 Resume。

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::observability::RunTrace;
use crate::stream::{AgentEvent, EmitError, EventSink};

/// Agent / Tool 调用时收到的上下文
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    cancel_token: CancellationToken,
    deadline: Option<Instant>,
    events: Option<EventSink>,
    trace: Option<RunTrace>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用外部令牌（如进程级关闭信号的 token）
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_trace(mut self, trace: RunTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 已取消或已过截止时间
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn trace(&self) -> Option<&RunTrace> {
        self.trace.as_ref()
    }

    /// 追踪 span；未配置追踪时为禁用的 span
    pub fn span(&self) -> tracing::Span {
        self.trace
            .as_ref()
            .map(|t| t.span().clone())
            .unwrap_or_else(tracing::Span::none)
    }

    /// 为单次 run 派生：子取消令牌 + 该 run 的事件出口
    pub(crate) fn for_run(&self, token: CancellationToken, sink: EventSink) -> Self {
        Self {
            cancel_token: token,
            deadline: self.deadline,
            events: Some(sink),
            trace: self.trace.clone(),
        }
    }

    /// 推送事件；没有事件出口时直接丢弃
    pub async fn emit(&self, event: AgentEvent) -> Result<(), EmitError> {
        match &self.events {
            Some(sink) => sink.emit(event).await,
            None => Ok(()),
        }
    }
}

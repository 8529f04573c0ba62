//! 可观测性：日志初始化与单次 run 的追踪作用域
//!
//! 追踪状态不放全局：RunTrace 由调用方创建、随 RunContext 传入 Start / Resume，
//! 结束时由调用方显式 finish。

use std::time::Instant;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化日志：默认 info，可通过 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// 单次 run 的追踪作用域（根 span + 起始时间）
#[derive(Clone, Debug)]
pub struct RunTrace {
    span: tracing::Span,
    started: Instant,
}

impl RunTrace {
    pub fn new(request: &str) -> Self {
        Self {
            span: tracing::info_span!("plan_execute_run", request = %preview(request, 120)),
            started: Instant::now(),
        }
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// 结束追踪：记录耗时与结果
    pub fn finish(self, outcome: &str) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.span.in_scope(|| {
            tracing::info!(elapsed_ms, outcome, "run trace finished");
        });
    }
}

/// 截断过长文本，用于日志与事件预览
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("北京三日游", 2), "北京...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_trace_finish_does_not_panic_without_subscriber() {
        RunTrace::new("plan a trip").finish("completed");
    }
}

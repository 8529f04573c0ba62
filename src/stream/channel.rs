//! 单槽事件通道
//!
//! 生产者（后台编排任务）通过 EventSink 推送事件，消费者通过 EventStream::next 拉取。
//! 通道容量为 1：消费者取走前一条之前，生产者的下一次 emit 会挂起。
//! 取消令牌触发后，正在等待的 next 立即返回 None，emit 返回 EmitError::Cancelled。

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::stream::AgentEvent;

/// 推送失败原因；两者都意味着生产者应放弃后续工作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("run cancelled")]
    Cancelled,
    #[error("event stream closed")]
    Closed,
}

/// 创建一对 (EventSink, EventStream)，共享同一个取消令牌
pub fn event_channel(cancel: CancellationToken, run_id: impl Into<String>) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(1);
    let sink = EventSink {
        tx,
        cancel: cancel.clone(),
        finished: Arc::new(AtomicBool::new(false)),
    };
    let stream = EventStream {
        rx,
        cancelled: Box::pin(cancel.clone().cancelled_owned()),
        cancel,
        run_id: run_id.into(),
        done: false,
    };
    (sink, stream)
}

/// 生产者一端
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
    /// 已发出终结事件（Interrupted / Completed / Failed）
    finished: Arc<AtomicBool>,
}

impl EventSink {
    /// 推送一条事件；槽位被占用时等待消费者取走
    pub async fn emit(&self, event: AgentEvent) -> Result<(), EmitError> {
        if event.is_terminal() {
            if self.finished.swap(true, Ordering::SeqCst) {
                tracing::warn!(kind = event.kind(), "dropping terminal event after stream end");
                return Err(EmitError::Closed);
            }
        } else if self.finished.load(Ordering::SeqCst) {
            tracing::warn!(kind = event.kind(), "dropping event after stream end");
            return Err(EmitError::Closed);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EmitError::Cancelled),
            sent = self.tx.send(event) => sent.map_err(|_| EmitError::Closed),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// 消费者一端：不可重启，耗尽或取消后只返回 None
pub struct EventStream {
    rx: mpsc::Receiver<AgentEvent>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    cancel: CancellationToken,
    run_id: String,
    done: bool,
}

impl EventStream {
    /// 拉取下一条事件；None 表示流已结束（完成、中断、失败或被取消）
    pub async fn next(&mut self) -> Option<AgentEvent> {
        std::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    /// 取消本次 run：正在等待的 next 返回 None，生产者放弃后续步骤
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 断点 ID（也是 Interrupted 事件里的 resume_token）
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 拉取直到结束，返回全部事件
    pub async fn collect_all(mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(ev) = self.next().await {
            events.push(ev);
        }
        events
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<AgentEvent>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.cancelled.as_mut().poll(cx).is_ready() {
            self.finish();
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(event)),
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.rx.close();
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("run_id", &self.run_id)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Stream for EventStream {
    type Item = AgentEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        // 消费者放弃后不再让后台任务继续跑
        if !self.done {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn progress(n: u64) -> AgentEvent {
        AgentEvent::progress("test", json!(n))
    }

    #[tokio::test]
    async fn test_events_arrive_in_order_then_end() {
        let (sink, mut stream) = event_channel(CancellationToken::new(), "run");
        tokio::spawn(async move {
            for i in 0..3 {
                sink.emit(progress(i)).await.unwrap();
            }
            sink.emit(AgentEvent::Completed { output: "done".into() })
                .await
                .unwrap();
        });

        for i in 0..3 {
            assert_eq!(stream.next().await, Some(progress(i)));
        }
        assert!(matches!(stream.next().await, Some(AgentEvent::Completed { .. })));
        assert_eq!(stream.next().await, None);
        assert!(stream.is_done());
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_debug_shows_run_id_and_state() {
        let (_sink, stream) = event_channel(CancellationToken::new(), "trip-42");
        let shown = format!("{stream:?}");
        assert!(shown.contains("trip-42"), "{shown}");
        assert!(shown.contains("done: false"), "{shown}");
    }

    #[tokio::test]
    async fn test_single_slot_backpressure() {
        let (sink, mut stream) = event_channel(CancellationToken::new(), "run");
        sink.emit(progress(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), sink.emit(progress(2))).await;
        assert!(blocked.is_err(), "second emit must wait for the consumer");

        assert_eq!(stream.next().await, Some(progress(1)));
        sink.emit(progress(3)).await.unwrap();
        assert_eq!(stream.next().await, Some(progress(3)));
    }

    #[tokio::test]
    async fn test_cancel_unblocks_pending_next() {
        let token = CancellationToken::new();
        let (_sink, mut stream) = event_channel(token.clone(), "run");
        let waiter = tokio::spawn(async move { stream.next().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_cancel_hides_buffered_event() {
        let token = CancellationToken::new();
        let (sink, mut stream) = event_channel(token.clone(), "run");
        sink.emit(progress(1)).await.unwrap();
        stream.cancel();
        assert_eq!(stream.next().await, None);
        assert_eq!(sink.emit(progress(2)).await, Err(EmitError::Cancelled));
    }

    #[tokio::test]
    async fn test_nothing_after_terminal_event() {
        let (sink, mut stream) = event_channel(CancellationToken::new(), "run");
        let producer = tokio::spawn(async move {
            sink.emit(AgentEvent::Interrupted {
                reason: "ask".into(),
                resume_token: "run".into(),
            })
            .await
            .unwrap();
            let late = sink.emit(AgentEvent::Completed { output: "x".into() }).await;
            assert_eq!(late, Err(EmitError::Closed));
            assert!(sink.is_finished());
        });
        assert!(matches!(stream.next().await, Some(AgentEvent::Interrupted { .. })));
        producer.await.unwrap();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_dropped_stream_closes_sink() {
        let (sink, stream) = event_channel(CancellationToken::new(), "run");
        drop(stream);
        assert!(sink.emit(progress(1)).await.is_err());
    }
}

//! Executor：执行单个步骤的工具循环
//!
//! 每轮询问 LLM：输出 {"tool","args"} 则经 ToolExecutor 调用工具并把结果喂回，
//! 输出普通文本则作为本步骤答案结束。工具挂起时，已完成的调用与待续调用一起
//! 打包成 Continuation；Resume 时只续接待续调用，已完成的调用不会重跑。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::parse::{parse_executor_action, ExecutorAction};
use crate::agent::{Agent, AgentOutcome, Continuation, ExecutorInput, ResumeData, Suspension};
use crate::core::{AgentError, RunContext};
use crate::llm::{LlmClient, Message};
use crate::observability::preview;
use crate::plan::{Step, StepResult};
use crate::stream::AgentEvent;
use crate::tools::{tool_call_schema_json, ToolExecutor, ToolOutput};

/// Executor 产生的 Continuation 的 kind
pub const EXECUTOR_CONTINUATION_KIND: &str = "executor.tool_call";

pub const DEFAULT_EXECUTOR_PROMPT: &str = "You are a diligent assistant executing one step of a larger plan. \
Use the tools when you need information. When the step is complete, reply with a short plain-text answer.";

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// 一次已完成的工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ToolRecord {
    tool: String,
    args: Value,
    result: Value,
}

/// 挂起中的工具调用；state 属于工具本身
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PendingCall {
    tool: String,
    args: Value,
    state: Value,
}

/// Continuation.data 的结构，只有本模块解释
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SuspendedStep {
    step_id: String,
    completed: Vec<ToolRecord>,
    pending: PendingCall,
}

impl SuspendedStep {
    fn decode(resume: ResumeData, step: &Step) -> Result<(Self, Value), AgentError> {
        if resume.continuation.kind != EXECUTOR_CONTINUATION_KIND {
            return Err(AgentError::InvalidContinuation(format!(
                "unexpected kind '{}'",
                resume.continuation.kind
            )));
        }
        let state: SuspendedStep = serde_json::from_value(resume.continuation.data)
            .map_err(|e| AgentError::InvalidContinuation(e.to_string()))?;
        if state.step_id != step.id {
            return Err(AgentError::InvalidContinuation(format!(
                "continuation belongs to step '{}', not '{}'",
                state.step_id, step.id
            )));
        }
        Ok((state, resume.input))
    }
}

/// 工具一次调用后的走向
enum Settled {
    Continue,
    Suspend(Suspension),
}

pub struct LlmExecutor {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolExecutor>,
    instruction: String,
    max_tool_rounds: usize,
}

impl LlmExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolExecutor>) -> Self {
        Self {
            llm,
            tools,
            instruction: DEFAULT_EXECUTOR_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    fn system_prompt(&self) -> String {
        format!(
            "{}\n\nAvailable tools:\n{}\n\n## Tool call JSON Schema (respond ONLY with JSON matching this to call a tool)\n```json\n{}\n```",
            self.instruction,
            self.tools.registry().to_schema_json(),
            tool_call_schema_json()
        )
    }

    /// 重建本步骤的对话：任务说明 + 每次工具调用与结果
    fn messages(&self, input: &ExecutorInput, completed: &[ToolRecord]) -> Vec<Message> {
        let mut task = format!(
            "Overall request: {}\n\nYour current step: {}",
            input.request, input.step.description
        );
        if !input.results.is_empty() {
            task.push_str(&format!("\n\nResults of earlier steps:\n{}", input.results));
        }

        let mut messages = vec![Message::system(self.system_prompt()), Message::user(task)];
        for record in completed {
            let call = json!({ "tool": record.tool, "args": record.args });
            messages.push(Message::assistant(call.to_string()));
            messages.push(Message::user(format!("Tool result: {}", record.result)));
        }
        messages
    }

    async fn emit(&self, ctx: &RunContext, event: AgentEvent) -> Result<(), AgentError> {
        ctx.emit(event).await.map_err(|_| AgentError::Cancelled)
    }

    /// 处理工具输出：完成则记录并推送 ToolResult，挂起则打包 Continuation
    async fn settle(
        &self,
        ctx: &RunContext,
        step: &Step,
        completed: &mut Vec<ToolRecord>,
        tool: String,
        args: Value,
        output: ToolOutput,
    ) -> Result<Settled, AgentError> {
        match output {
            ToolOutput::Done(result) => {
                self.emit(
                    ctx,
                    AgentEvent::ToolResult {
                        name: tool.clone(),
                        result: result.clone(),
                    },
                )
                .await?;
                completed.push(ToolRecord { tool, args, result });
                Ok(Settled::Continue)
            }
            ToolOutput::Suspend { reason, state } => {
                tracing::info!(step_id = %step.id, tool = %tool, "tool suspended the step");
                let data = SuspendedStep {
                    step_id: step.id.clone(),
                    completed: std::mem::take(completed),
                    pending: PendingCall { tool, args, state },
                };
                let data = serde_json::to_value(data)
                    .map_err(|e| AgentError::InvalidOutput(e.to_string()))?;
                Ok(Settled::Suspend(Suspension {
                    reason,
                    continuation: Continuation::new(EXECUTOR_CONTINUATION_KIND, data),
                }))
            }
        }
    }
}

#[async_trait]
impl Agent for LlmExecutor {
    type Input = ExecutorInput;
    type Output = StepResult;

    fn name(&self) -> &str {
        "executor"
    }

    async fn run(
        &self,
        ctx: &RunContext,
        mut input: ExecutorInput,
    ) -> Result<AgentOutcome<StepResult>, AgentError> {
        let step = input.step.clone();
        let mut completed = Vec::new();

        if let Some(resume) = input.resume.take() {
            let (suspended, supplied) = SuspendedStep::decode(resume, &step)?;
            completed = suspended.completed;
            let PendingCall { tool, args, state } = suspended.pending;
            let output = match self.tools.resume(ctx, &tool, state, supplied).await {
                Ok(output) => output,
                Err(e) => return Ok(AgentOutcome::Complete(StepResult::failure(step, e.to_string()))),
            };
            if let Settled::Suspend(s) = self.settle(ctx, &step, &mut completed, tool, args, output).await? {
                return Ok(AgentOutcome::Suspend(s));
            }
        }

        while completed.len() < self.max_tool_rounds {
            if ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let reply = self
                .llm
                .complete(&self.messages(&input, &completed))
                .await
                .map_err(AgentError::LlmError)?;

            let call = match parse_executor_action(&reply)? {
                ExecutorAction::Answer(answer) => {
                    let payload = json!({ "answer": answer, "tool_results": completed });
                    return Ok(AgentOutcome::Complete(StepResult::success(step, payload)));
                }
                ExecutorAction::ToolCall(call) => call,
            };

            tracing::debug!(
                step_id = %step.id,
                tool = %call.tool,
                args = %preview(&call.args.to_string(), 200),
                "executor tool call"
            );
            self.emit(
                ctx,
                AgentEvent::ToolCall {
                    name: call.tool.clone(),
                    args: call.args.clone(),
                },
            )
            .await?;

            let output = match self.tools.execute(ctx, &call.tool, call.args.clone()).await {
                Ok(output) => output,
                Err(e) => return Ok(AgentOutcome::Complete(StepResult::failure(step, e.to_string()))),
            };
            if let Settled::Suspend(s) = self
                .settle(ctx, &step, &mut completed, call.tool, call.args, output)
                .await?
            {
                return Ok(AgentOutcome::Suspend(s));
            }
        }

        Ok(AgentOutcome::Complete(StepResult::failure(
            step,
            format!("no answer after {} tool rounds", self.max_tool_rounds),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::plan::ExecutionResults;
    use crate::tools::{register_travel_tools, EchoTool, ToolRegistry};

    fn tools() -> Arc<ToolExecutor> {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        register_travel_tools(&mut registry);
        Arc::new(ToolExecutor::new(registry, 5))
    }

    fn input(step: Step) -> ExecutorInput {
        ExecutorInput {
            request: "Plan a trip to Tokyo".into(),
            step,
            results: ExecutionResults::new(),
            resume: None,
        }
    }

    #[tokio::test]
    async fn test_bracketed_prose_answer_completes_step() {
        let llm = Arc::new(MockLlmClient::new(["Expect highs around [15-20] C in Tokyo."]));
        let executor = LlmExecutor::new(llm, tools());
        let outcome = executor
            .run(&RunContext::new(), input(Step::with_id("s1", "check weather")))
            .await
            .unwrap();
        let AgentOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.payload["answer"], "Expect highs around [15-20] C in Tokyo.");
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let llm = Arc::new(MockLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "hello"}}"#,
            "Echoed hello.",
        ]));
        let executor = LlmExecutor::new(llm.clone(), tools());
        let outcome = executor
            .run(&RunContext::new(), input(Step::with_id("s1", "say hello")))
            .await
            .unwrap();
        let AgentOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert!(result.is_success());
        assert_eq!(result.payload["answer"], "Echoed hello.");
        assert_eq!(result.payload["tool_results"][0]["result"]["text"], "hello");

        // 第二轮对话带上了第一轮的工具结果
        let calls = llm.calls();
        assert!(calls[1].last().unwrap().content.contains("hello"));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_the_step() {
        let llm = Arc::new(MockLlmClient::new([r#"{"tool": "teleport", "args": {}}"#]));
        let outcome = LlmExecutor::new(llm, tools())
            .run(&RunContext::new(), input(Step::with_id("s1", "go")))
            .await
            .unwrap();
        let AgentOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert!(result.error.unwrap().reason.contains("teleport"));
    }

    #[tokio::test]
    async fn test_suspend_and_resume_skip_completed_calls() {
        let llm = Arc::new(MockLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "first"}}"#,
            r#"{"tool": "ask_for_clarification", "args": {"question": "Which dates?"}}"#,
        ]));
        let executor = LlmExecutor::new(llm.clone(), tools());
        let step = Step::with_id("s2", "book hotel");
        let outcome = executor
            .run(&RunContext::new(), input(step.clone()))
            .await
            .unwrap();
        let AgentOutcome::Suspend(suspension) = outcome else {
            panic!("expected suspension");
        };
        assert_eq!(suspension.reason, "Which dates?");
        assert_eq!(suspension.continuation.kind, EXECUTOR_CONTINUATION_KIND);

        llm.push_response("Booked for Oct 1-3.");
        let mut resumed = input(step);
        resumed.resume = Some(ResumeData {
            continuation: suspension.continuation,
            input: json!("Oct 1-3"),
        });
        let AgentOutcome::Complete(result) =
            executor.run(&RunContext::new(), resumed).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(result.payload["answer"], "Booked for Oct 1-3.");
        let tool_results = result.payload["tool_results"].as_array().unwrap();
        assert_eq!(tool_results.len(), 2);
        assert_eq!(tool_results[1]["result"]["answer"], "Oct 1-3");
        // 挂起前两次 + 恢复后一次
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_resume_rejects_foreign_continuation() {
        let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
        let mut resumed = input(Step::with_id("s1", "x"));
        resumed.resume = Some(ResumeData {
            continuation: Continuation::new("someone.else", json!({})),
            input: Value::Null,
        });
        let err = LlmExecutor::new(llm, tools())
            .run(&RunContext::new(), resumed)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidContinuation(_)));
    }

    #[tokio::test]
    async fn test_round_limit_fails_the_step() {
        let llm = Arc::new(MockLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "a"}}"#,
            r#"{"tool": "echo", "args": {"text": "b"}}"#,
        ]));
        let outcome = LlmExecutor::new(llm, tools())
            .with_max_tool_rounds(2)
            .run(&RunContext::new(), input(Step::with_id("s1", "loop")))
            .await
            .unwrap();
        let AgentOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert!(!result.is_success());
    }
}

//! Replanner：根据执行结果决定结束还是修订计划
//!
//! 模板支持 {input}、{plan}、{results} 三个占位符。{plan} 中未完成步骤带 id，
//! 模型在修订中沿用 id 即表示保留该步骤。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::parse::parse_replan;
use crate::agent::{Agent, AgentOutcome, ReplannerInput};
use crate::core::{AgentError, RunContext};
use crate::llm::{LlmClient, Message};
use crate::plan::{Plan, ReplanDecision};

pub const DEFAULT_REPLANNER_PROMPT: &str = "You are reviewing the progress of a plan.

Objective:
{input}

Current plan:
{plan}

Results so far:
{results}

If the objective is met, respond with JSON {\"action\": \"finalize\", \"summary\": \"<final answer for the user>\"}.
Otherwise respond with JSON {\"action\": \"continue\", \"steps\": [...]} listing ONLY the remaining steps. \
Keep a pending step by repeating it as {\"id\": \"<id>\", \"description\": \"...\"}; new steps may be plain strings.";

pub struct LlmReplanner {
    llm: Arc<dyn LlmClient>,
    template: String,
}

impl LlmReplanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_template(llm, DEFAULT_REPLANNER_PROMPT)
    }

    pub fn with_template(llm: Arc<dyn LlmClient>, template: impl Into<String>) -> Self {
        Self {
            llm,
            template: template.into(),
        }
    }

    fn render(&self, input: &ReplannerInput) -> String {
        let results = if input.results.is_empty() {
            "(none)".to_string()
        } else {
            input.results.to_string()
        };
        self.template
            .replace("{input}", &input.request)
            .replace("{plan}", &plan_listing(&input.plan))
            .replace("{results}", &results)
    }
}

/// 已完成步骤只列状态；未完成步骤附 id 供模型引用
fn plan_listing(plan: &Plan) -> String {
    plan.steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            if step.status.is_finished() {
                format!("{}. [{}] {}", i + 1, step.status, step.description)
            } else {
                format!("{}. [{}] (id: {}) {}", i + 1, step.status, step.id, step.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Agent for LlmReplanner {
    type Input = ReplannerInput;
    type Output = ReplanDecision;

    fn name(&self) -> &str {
        "replanner"
    }

    async fn run(
        &self,
        ctx: &RunContext,
        input: ReplannerInput,
    ) -> Result<AgentOutcome<ReplanDecision>, AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let prompt = self.render(&input);
        let output = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::LlmError)?;
        let decision = parse_replan(&output)?;
        tracing::debug!(round = input.round, "replan decision parsed");
        Ok(AgentOutcome::Complete(decision))
    }
}

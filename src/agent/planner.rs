//! Planner：把用户请求拆成有序步骤
//!
//! 拼 system（角色说明 + 输出格式）+ user（请求）后调用 LLM，
//! 由 parse_plan 解析为 Plan。空计划视为无效输出。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::parse::parse_plan;
use crate::agent::{Agent, AgentOutcome, PlannerInput};
use crate::core::{AgentError, RunContext};
use crate::llm::{LlmClient, Message};
use crate::plan::Plan;

pub const DEFAULT_PLANNER_PROMPT: &str = "You are an expert planner. \
Break the user's request into a short list of concrete, executable steps. \
Each step must be something a single assistant can finish with the available tools.";

const PLAN_FORMAT: &str = "Respond ONLY with JSON: {\"steps\": [\"step 1\", \"step 2\", ...]}";

pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    instruction: String,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_instruction(llm, DEFAULT_PLANNER_PROMPT)
    }

    pub fn with_instruction(llm: Arc<dyn LlmClient>, instruction: impl Into<String>) -> Self {
        Self {
            llm,
            instruction: instruction.into(),
        }
    }

    fn messages(&self, input: &PlannerInput) -> Vec<Message> {
        let system = format!("{}\n\n{}", self.instruction, PLAN_FORMAT);
        let user = format!("Request: {}", input.request);
        vec![Message::system(system), Message::user(user)]
    }
}

#[async_trait]
impl Agent for LlmPlanner {
    type Input = PlannerInput;
    type Output = Plan;

    fn name(&self) -> &str {
        "planner"
    }

    async fn run(
        &self,
        ctx: &RunContext,
        input: PlannerInput,
    ) -> Result<AgentOutcome<Plan>, AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let output = self
            .llm
            .complete(&self.messages(&input))
            .await
            .map_err(AgentError::LlmError)?;

        let plan = parse_plan(&output)?;
        if plan.is_empty() {
            return Err(AgentError::InvalidOutput("planner produced no steps".into()));
        }
        tracing::debug!(steps = plan.len(), "plan parsed");
        Ok(AgentOutcome::Complete(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_plan_from_fenced_json() {
        let llm = Arc::new(MockLlmClient::new([
            "Here you go:\n```json\n{\"steps\": [\"Check weather\", \"Search flights\"]}\n```",
        ]));
        let planner = LlmPlanner::new(llm.clone());
        let outcome = planner
            .run(&RunContext::new(), PlannerInput::new("Trip to Tokyo"))
            .await
            .unwrap();
        let AgentOutcome::Complete(plan) = outcome else {
            panic!("planner must not suspend");
        };
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].description, "Check weather");

        let calls = llm.calls();
        assert_eq!(calls[0][1].content, "Request: Trip to Tokyo");
    }

    #[tokio::test]
    async fn test_empty_plan_is_invalid() {
        let llm = Arc::new(MockLlmClient::new([r#"{"steps": []}"#]));
        let err = LlmPlanner::new(llm)
            .run(&RunContext::new(), PlannerInput::new("nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_llm_error() {
        let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
        let err = LlmPlanner::new(llm)
            .run(&RunContext::new(), PlannerInput::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::LlmError(_)));
    }
}

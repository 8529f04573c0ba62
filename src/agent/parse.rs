//! 模型输出解析：从文本中提取 JSON，解析为计划、工具调用或重规划决策

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::plan::{Plan, ReplanDecision, Step};

/// 模型给出的工具调用（{"tool": "get_weather", "args": {"city": "..."}}）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// Executor 每轮的动作：调用工具，或给出本步骤的最终回答
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorAction {
    ToolCall(ToolCall),
    Answer(String),
}

/// 提取 JSON 块（```json ... ``` 或首个 { / [ 到最后一个 } / ]）
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find(['{', '['])?;
    let close = if trimmed[start..].starts_with('{') { '}' } else { ']' };
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}

fn parse_value(output: &str) -> Result<Value, AgentError> {
    let json = extract_json(output)
        .ok_or_else(|| AgentError::JsonParseError(format!("no JSON found in: {}", output.trim())))?;
    serde_json::from_str(json).map_err(|e| AgentError::JsonParseError(format!("{e}: {json}")))
}

/// 含合法 JSON 且 tool 非空为 ToolCall，否则为 Answer。
/// 只有形似工具调用（对象且带 "tool" 键）却解析失败时才报错，
/// 正文里偶然出现的括号（如 "[15-20] C"）仍按回答处理。
pub fn parse_executor_action(output: &str) -> Result<ExecutorAction, AgentError> {
    let trimmed = output.trim();
    let Some(json) = extract_json(trimmed) else {
        return Ok(ExecutorAction::Answer(trimmed.to_string()));
    };
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) if json.starts_with('{') && json.contains("\"tool\"") => {
            return Err(AgentError::JsonParseError(format!("{e}: {json}")));
        }
        Err(_) => return Ok(ExecutorAction::Answer(trimmed.to_string())),
    };

    match value.get("tool").and_then(Value::as_str) {
        Some(tool) if !tool.is_empty() => {
            let call: ToolCall = serde_json::from_value(value)
                .map_err(|e| AgentError::JsonParseError(e.to_string()))?;
            Ok(ExecutorAction::ToolCall(call))
        }
        _ => Ok(ExecutorAction::Answer(trimmed.to_string())),
    }
}

/// 步骤草稿：纯文本为新步骤；带 id 的对象沿用已有步骤
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepDraft {
    Text(String),
    Object {
        #[serde(default)]
        id: Option<String>,
        description: String,
    },
}

impl From<StepDraft> for Step {
    fn from(draft: StepDraft) -> Self {
        match draft {
            StepDraft::Text(description) => Step::new(description),
            StepDraft::Object {
                id: Some(id),
                description,
            } => Step::with_id(id, description),
            StepDraft::Object {
                id: None,
                description,
            } => Step::new(description),
        }
    }
}

fn steps_from(value: Value) -> Result<Vec<Step>, AgentError> {
    let drafts: Vec<StepDraft> =
        serde_json::from_value(value).map_err(|e| AgentError::JsonParseError(e.to_string()))?;
    Ok(drafts
        .into_iter()
        .map(Step::from)
        .filter(|s| !s.description.trim().is_empty())
        .collect())
}

/// 解析 {"steps": [...]} 或裸数组为 Plan
pub fn parse_plan(output: &str) -> Result<Plan, AgentError> {
    let value = parse_value(output)?;
    let steps = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove("steps")
            .ok_or_else(|| AgentError::InvalidOutput("plan is missing `steps`".into()))?,
        _ => return Err(AgentError::InvalidOutput("plan must be an object or array".into())),
    };
    Ok(Plan::new(steps_from(steps)?))
}

/// 解析 {"action": "finalize", "summary": ...} 或 {"action": "continue", "steps": [...]}
pub fn parse_replan(output: &str) -> Result<ReplanDecision, AgentError> {
    let mut value = parse_value(output)?;
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    match action.as_str() {
        "finalize" | "respond" | "finish" => {
            let summary = value
                .get("summary")
                .or_else(|| value.get("response"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(ReplanDecision::Finalize { summary })
        }
        "continue" | "plan" | "replan" => {
            let steps = value
                .get_mut("steps")
                .map(Value::take)
                .ok_or_else(|| AgentError::InvalidOutput("revision is missing `steps`".into()))?;
            Ok(ReplanDecision::ContinueWithPlan {
                plan: Plan::new(steps_from(steps)?),
            })
        }
        other => Err(AgentError::InvalidOutput(format!(
            "unknown replan action '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_fence_and_prose() {
        let fenced = "Sure:\n```json\n{\"steps\": [\"a\"]}\n```\nthanks";
        assert_eq!(extract_json(fenced), Some("{\"steps\": [\"a\"]}"));
        assert_eq!(extract_json("plan: [\"a\", \"b\"] ok"), Some("[\"a\", \"b\"]"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_executor_action() {
        let call = parse_executor_action(r#"{"tool": "get_weather", "args": {"city": "Tokyo"}}"#)
            .unwrap();
        assert_eq!(
            call,
            ExecutorAction::ToolCall(ToolCall {
                tool: "get_weather".into(),
                args: json!({"city": "Tokyo"})
            })
        );
        assert_eq!(
            parse_executor_action("It will be sunny.").unwrap(),
            ExecutorAction::Answer("It will be sunny.".into())
        );
        assert!(matches!(
            parse_executor_action(r#"{"temperature": 15}"#).unwrap(),
            ExecutorAction::Answer(_)
        ));
        assert!(matches!(
            parse_executor_action(r#"{"tool": "x", "args": }"#),
            Err(AgentError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_prose_with_brackets_is_an_answer() {
        for text in [
            "Expect highs around [15-20] C in Tokyo.",
            "Budget {roughly 900 USD} for flights.",
            "Options: [A] morning flight, [B] evening flight.",
        ] {
            assert_eq!(
                parse_executor_action(text).unwrap(),
                ExecutorAction::Answer(text.to_string())
            );
        }
    }

    #[test]
    fn test_parse_plan_accepts_strings_and_objects() {
        let plan = parse_plan(
            r#"{"steps": ["Check weather", {"description": "Search flights"}, "  "]}"#,
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[1].description, "Search flights");
        assert_ne!(plan.steps[0].id, plan.steps[1].id);

        assert_eq!(parse_plan(r#"["one"]"#).unwrap().len(), 1);
        assert!(matches!(
            parse_plan(r#"{"tasks": []}"#),
            Err(AgentError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_parse_replan_variants() {
        assert_eq!(
            parse_replan(r#"{"action": "finalize", "summary": "Trip planned"}"#).unwrap(),
            ReplanDecision::Finalize {
                summary: "Trip planned".into()
            }
        );
        let ReplanDecision::ContinueWithPlan { plan } = parse_replan(
            r#"{"action": "continue", "steps": [{"id": "s-2", "description": "Hotels"}, "Itinerary"]}"#,
        )
        .unwrap() else {
            panic!("expected ContinueWithPlan");
        };
        assert_eq!(plan.steps[0].id, "s-2");
        assert_eq!(plan.steps[1].description, "Itinerary");
        assert!(parse_replan(r#"{"action": "dance"}"#).is_err());
    }
}

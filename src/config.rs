//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEE__*` 覆盖（双下划线表示嵌套，如 `BEE__ORCHESTRATOR__MAX_REPLAN_ROUNDS=3`）。
//! 所有段缺省时取默认值。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::checkpoint::ConflictPolicy;
use crate::core::OrchestratorConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorSection,
    pub checkpoint: CheckpointSection,
    pub planner: PromptSection,
    pub executor: ExecutorSection,
    pub replanner: PromptSection,
    pub tools: ToolsSection,
}

/// [orchestrator] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub max_replan_rounds: usize,
    pub abort_on_step_error: bool,
    /// 单步超时（秒），未设置则不限
    pub step_timeout_secs: Option<u64>,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_replan_rounds: 10,
            abort_on_step_error: false,
            step_timeout_secs: None,
        }
    }
}

impl OrchestratorSection {
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_replan_rounds: self.max_replan_rounds,
            abort_on_step_error: self.abort_on_step_error,
            step_timeout: self.step_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// [checkpoint] 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    pub conflict_policy: ConflictPolicy,
}

/// [planner] / [replanner] 段：覆盖默认提示词
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    pub system_prompt: Option<String>,
}

/// [executor] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// 单个步骤内最多调用工具的轮数
    pub max_tool_rounds: usize,
    pub system_prompt: Option<String>,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            system_prompt: None,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
        }
    }
}

/// 加载配置：先默认路径 config/default.toml（若存在），再可选显式路径，最后环境变量覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BEE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_absent() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.orchestrator.max_replan_rounds, 10);
        assert_eq!(cfg.executor.max_tool_rounds, 8);
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.checkpoint.conflict_policy, ConflictPolicy::Reject);
        assert!(cfg.orchestrator.to_orchestrator_config().step_timeout.is_none());
    }

    #[test]
    fn test_load_from_explicit_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[orchestrator]
max_replan_rounds = 3
step_timeout_secs = 45

[checkpoint]
conflict_policy = "overwrite"

[replanner]
system_prompt = "Decide: {{input}}"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.orchestrator.max_replan_rounds, 3);
        assert!(!cfg.orchestrator.abort_on_step_error);
        assert_eq!(
            cfg.orchestrator.to_orchestrator_config().step_timeout,
            Some(Duration::from_secs(45))
        );
        assert_eq!(cfg.checkpoint.conflict_policy, ConflictPolicy::Overwrite);
        assert_eq!(cfg.replanner.system_prompt.as_deref(), Some("Decide: {input}"));
        assert_eq!(cfg.executor.max_tool_rounds, 8);
    }
}

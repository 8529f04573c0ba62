//! 编排器构建器：统一的组件初始化逻辑
//!
//! 由 AppConfig 与一个 LlmClient 组装出三个 LLM 角色、工具执行器与断点存储。
//! 提示词优先级：配置中的 system_prompt > config/prompts/<role>.md > 内置默认。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::executor::DEFAULT_EXECUTOR_PROMPT;
use crate::agent::planner::DEFAULT_PLANNER_PROMPT;
use crate::agent::replanner::DEFAULT_REPLANNER_PROMPT;
use crate::agent::{LlmExecutor, LlmPlanner, LlmReplanner};
use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use crate::config::AppConfig;
use crate::core::PlanExecuteOrchestrator;
use crate::llm::LlmClient;
use crate::tools::{register_travel_tools, EchoTool, ToolExecutor, ToolRegistry};

pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
    tools: Option<ToolRegistry>,
    store: Option<Arc<dyn CheckpointStore>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            llm,
            tools: None,
            store: None,
        }
    }

    /// 使用自定义工具注册表（默认：旅行演示工具 + echo）
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// 使用自定义断点存储（默认：按配置冲突策略的内存存储）
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 默认工具注册表
    pub fn build_tool_registry(&self) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        register_travel_tools(&mut tools);
        tools
    }

    pub fn build(mut self) -> PlanExecuteOrchestrator {
        let tools = match self.tools.take() {
            Some(tools) => tools,
            None => self.build_tool_registry(),
        };
        let tool_executor = Arc::new(ToolExecutor::new(tools, self.config.tools.tool_timeout_secs));
        tracing::info!(tools = ?tool_executor.tool_names(), "tools registered");

        let planner_prompt = resolve_prompt(
            self.config.planner.system_prompt.as_deref(),
            "planner",
            DEFAULT_PLANNER_PROMPT,
        );
        let executor_prompt = resolve_prompt(
            self.config.executor.system_prompt.as_deref(),
            "executor",
            DEFAULT_EXECUTOR_PROMPT,
        );
        let replanner_prompt = resolve_prompt(
            self.config.replanner.system_prompt.as_deref(),
            "replanner",
            DEFAULT_REPLANNER_PROMPT,
        );

        let planner = LlmPlanner::with_instruction(self.llm.clone(), planner_prompt);
        let executor = LlmExecutor::new(self.llm.clone(), tool_executor)
            .with_instruction(executor_prompt)
            .with_max_tool_rounds(self.config.executor.max_tool_rounds);
        let replanner = LlmReplanner::with_template(self.llm, replanner_prompt);

        let store = self.store.unwrap_or_else(|| {
            Arc::new(InMemoryCheckpointStore::with_policy(
                self.config.checkpoint.conflict_policy,
            ))
        });

        PlanExecuteOrchestrator::new(Arc::new(planner), Arc::new(executor), Arc::new(replanner), store)
            .with_config(self.config.orchestrator.to_orchestrator_config())
    }
}

fn resolve_prompt(configured: Option<&str>, role: &str, default: &str) -> String {
    if let Some(prompt) = configured.filter(|p| !p.trim().is_empty()) {
        return prompt.to_string();
    }
    [
        PathBuf::from(format!("config/prompts/{role}.md")),
        PathBuf::from(format!("../config/prompts/{role}.md")),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .unwrap_or_else(|| default.to_string())
}

/// 便捷函数：加载配置（失败时退回默认）并创建构建器
pub fn create_orchestrator_builder(
    config_path: Option<PathBuf>,
    llm: Arc<dyn LlmClient>,
) -> OrchestratorBuilder {
    let config = crate::config::load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    OrchestratorBuilder::new(config, llm)
}

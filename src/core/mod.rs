//! 核心编排层：错误分类、运行上下文、阶段状态、构建器、主控循环

pub mod builder;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use builder::{create_orchestrator_builder, OrchestratorBuilder};
pub use context::RunContext;
pub use error::{AgentError, CheckpointError, RunError, StepError, ToolError};
pub use orchestrator::{OrchestratorConfig, PlanExecuteOrchestrator, StartOptions};
pub use state::{RunPhase, RunState};

//! Bee Orchestra - Plan-Execute-Replan 多 Agent 编排核心
//!
//! 模块划分：
//! - **agent**: 统一 Agent 契约与 LLM 驱动的 Planner / Executor / Replanner
//! - **checkpoint**: 断点存储抽象、内存实现与快照格式
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、运行上下文、阶段状态、编排器与构建器
//! - **llm**: LLM 客户端抽象与 Mock 实现
//! - **observability**: 日志初始化与单次 run 的追踪作用域
//! - **plan**: 计划、步骤、执行结果与重规划决策
//! - **stream**: 单槽、可取消的事件流
//! - **tools**: 工具注册表、执行器、强类型适配与旅行演示工具

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod plan;
pub mod stream;
pub mod tools;

pub use crate::core::{PlanExecuteOrchestrator, RunContext, RunError, StartOptions};
pub use crate::stream::{AgentEvent, EventStream};

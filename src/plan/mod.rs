//! 计划层：Plan / Step / StepResult / ReplanDecision

pub mod types;

pub use types::{
    ExecutionResults, Plan, ReplanDecision, Step, StepId, StepResult, StepStatus, TransitionError,
};

//! Core logic including the agent loop, tool execution and delegation
//! from a manager agent to its specialists.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    APPROVAL_TOOL_NAME, Agent, AgentBuilder, AgentEvent, AgentEventKind,
    AgentRole, BudgetGate, BudgetPolicy, DEFAULT_SPECIALIST_MAX_ITERATIONS,
    ModelSelection, RunError, RunResult, TaskContext, TaskRunner,
    render_task, specialist_tool_name,
};
pub use model_client::{ModelClient, ModelClientResponse, RetryPolicy};

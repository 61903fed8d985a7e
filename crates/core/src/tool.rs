//! Tool call supports.

mod approval;
mod error;
mod object;
mod outcome;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use approval::{
    ApprovalDecision, ApprovalPolicy, ApprovalRequest, RiskLevel,
};
pub use error::{Error, ErrorKind};
pub use outcome::ToolOutcome;
pub use registry::ToolRegistry;

/// The result of a tool call.
pub type ToolResult = Result<Value, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as an API key or a shared store.
/// To do this, make the context an immutable state of the tool, which can be
/// set during initialization, and copy it when executing.
///
/// Failures are returned as `Err` and reported back to the model. They never
/// abort the agent run.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

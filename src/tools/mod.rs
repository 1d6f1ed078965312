//! Agent tool boundary
//!
//! Tools are (name, description, parameter schema, executor) entries in a
//! [`ToolCatalog`]. Arguments are validated by the pure [`schema::validate`]
//! before any executor runs; executors return [`ToolResult`] so failures
//! reach the agent as readable values.

pub mod browser;
pub mod catalog;
pub mod files;
pub mod result;
pub mod schema;
pub mod shell;
pub mod skills;
pub mod tasks;
pub mod traits;

pub use catalog::{InvocationError, ToolCatalog, ToolRequest, ToolResponse, ToolServices};
pub use result::{success, Failure, OrFailure, ToolResult};
pub use schema::{JsonSchema, ParamSpec, ParamType, PropertySchema, SchemaViolation};
pub use shell::{CommandOutput, CommandRunner, CommandSpec, LocalCommandRunner, RunError};
pub use traits::{AgentTool, ToolCategory, ToolDescriptor};

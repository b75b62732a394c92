//! Container-backed tool catalogue.
//!
//! Tools are static: each maps a validated argument set to one image and one
//! argument vector. Nothing is registered at runtime.

mod args;
pub mod builtin;
mod registry;

pub use args::MAX_ARGUMENT_CHARS;
pub use builtin::{SherlockArgs, SpiderfootArgs, ToolInvocation};
pub use registry::{ParamSpec, ParamType, ToolDefinition, ToolRegistry, ToolSummary};

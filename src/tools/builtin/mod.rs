//! Built-in container-backed tools.
//!
//! Each tool owns a typed argument struct; [`ToolInvocation`] is the tagged
//! union the orchestrator dispatches on.

pub mod sherlock;
pub mod spiderfoot;

use serde_json::Value;

use crate::error::ToolError;
use crate::sandbox::ImageRef;
use crate::tools::registry::ToolDefinition;

pub use sherlock::SherlockArgs;
pub use spiderfoot::SpiderfootArgs;

/// A validated request for one specific tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    SherlockMaigret(SherlockArgs),
    Spiderfoot(SpiderfootArgs),
}

impl ToolInvocation {
    /// Every built-in tool definition, in listing order.
    pub fn definitions() -> &'static [&'static ToolDefinition] {
        static DEFINITIONS: [&ToolDefinition; 2] = [&sherlock::DEFINITION, &spiderfoot::DEFINITION];
        &DEFINITIONS
    }

    /// Dispatch on the tool identifier and validate its arguments.
    pub fn prepare(tool_id: &str, args: &Value) -> Result<Self, ToolError> {
        match tool_id {
            sherlock::ID => SherlockArgs::from_value(args).map(Self::SherlockMaigret),
            spiderfoot::ID => SpiderfootArgs::from_value(args).map(Self::Spiderfoot),
            other => Err(ToolError::NotFound {
                name: other.to_string(),
            }),
        }
    }

    pub fn definition(&self) -> &'static ToolDefinition {
        match self {
            Self::SherlockMaigret(_) => &sherlock::DEFINITION,
            Self::Spiderfoot(_) => &spiderfoot::DEFINITION,
        }
    }

    pub fn tool_id(&self) -> &'static str {
        self.definition().id
    }

    pub fn image(&self) -> ImageRef {
        ImageRef::parse(self.definition().image)
    }

    /// Ordered argument vector handed to the container.
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::SherlockMaigret(args) => args.argv(),
            Self::Spiderfoot(args) => args.argv(),
        }
    }
}

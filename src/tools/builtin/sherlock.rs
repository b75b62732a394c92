//! Username search across social networks (Sherlock).

use serde_json::Value;

use crate::error::ToolError;
use crate::safety::CharClass;
use crate::tools::args::{required_string, sanitize_argument};
use crate::tools::registry::{ParamSpec, ParamType, ToolDefinition};

pub const ID: &str = "sherlock-maigret";

pub static DEFINITION: ToolDefinition = ToolDefinition {
    id: ID,
    description: "Hunt down social media accounts by username across hundreds of sites.",
    image: "sherlockproject/sherlock",
    params: &[ParamSpec {
        name: "username",
        kind: ParamType::String,
        required: true,
        description: "Username to search for (letters, digits, '-' and '_')",
    }],
};

/// Validated arguments for a Sherlock run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SherlockArgs {
    pub username: String,
}

impl SherlockArgs {
    pub fn from_value(args: &Value) -> Result<Self, ToolError> {
        let raw = required_string(ID, args, "username")?;
        let username = sanitize_argument(ID, "username", raw, CharClass::Identifier)?;
        Ok(Self { username })
    }

    pub fn argv(&self) -> Vec<String> {
        vec![self.username.clone(), "--no-color".to_string()]
    }
}

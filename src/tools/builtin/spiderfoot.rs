//! Automated OSINT footprinting (SpiderFoot).

use serde_json::Value;

use crate::error::ToolError;
use crate::safety::CharClass;
use crate::tools::args::{required_string, sanitize_argument};
use crate::tools::registry::{ParamSpec, ParamType, ToolDefinition};

pub const ID: &str = "spiderfoot";

pub static DEFINITION: ToolDefinition = ToolDefinition {
    id: ID,
    description: "Footprint a target (domain, IP address, subnet, e-mail) from public sources.",
    image: "smicallef/spiderfoot",
    params: &[ParamSpec {
        name: "target",
        kind: ParamType::String,
        required: true,
        description: "Scan target: domain, IP address, CIDR range or e-mail address",
    }],
};

/// Validated arguments for a SpiderFoot scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiderfootArgs {
    pub target: String,
}

impl SpiderfootArgs {
    pub fn from_value(args: &Value) -> Result<Self, ToolError> {
        let raw = required_string(ID, args, "target")?;
        let target = sanitize_argument(ID, "target", raw, CharClass::Target)?;
        Ok(Self { target })
    }

    pub fn argv(&self) -> Vec<String> {
        vec!["-s".to_string(), self.target.clone()]
    }
}

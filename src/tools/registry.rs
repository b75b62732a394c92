//! Static registry of container-backed tools.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::ToolError;
use crate::tools::builtin::ToolInvocation;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
}

impl ParamType {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub description: &'static str,
}

/// Immutable description of a tool: identity, image and argument schema.
#[derive(Debug, PartialEq, Eq)]
pub struct ToolDefinition {
    pub id: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolDefinition {
    /// JSON Schema for the tool's arguments.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            properties.insert(
                param.name.to_string(),
                json!({
                    "type": param.kind.json_type(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Listing entry served by `GET /tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub id: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub parameters: Value,
}

impl From<&ToolDefinition> for ToolSummary {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            id: def.id,
            description: def.description,
            image: def.image,
            parameters: def.parameters_schema(),
        }
    }
}

/// The set of tools the orchestrator will run.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<&'static ToolDefinition>,
}

impl ToolRegistry {
    /// Registry containing every built-in tool.
    pub fn builtin() -> Self {
        Self {
            tools: ToolInvocation::definitions().to_vec(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'static ToolDefinition> {
        self.tools.iter().copied().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[&'static ToolDefinition] {
        &self.tools
    }

    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.tools.iter().map(|t| ToolSummary::from(*t)).collect()
    }

    /// Validate `args` for `tool_id` and produce a ready-to-run invocation.
    pub fn prepare(&self, tool_id: &str, args: &Value) -> Result<ToolInvocation, ToolError> {
        if self.get(tool_id).is_none() {
            return Err(ToolError::NotFound {
                name: tool_id.to_string(),
            });
        }
        ToolInvocation::prepare(tool_id, args)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

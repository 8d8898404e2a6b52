//! The agent-facing tool surface.
//!
//! Each filesystem operation is exposed as a named tool taking JSON
//! arguments and returning text, the shape coding agents consume. Contract
//! errors come back as error replies with the message the backend produced,
//! so the agent can correct its call instead of retrying blindly.

mod fs_tools;
mod registry;

pub use fs_tools::{EditTool, GlobTool, GrepTool, LsTool, ReadTool, WriteTool, register_fs_tools};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

/// Schema for a tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    pub name: String,
    /// Type hint (string, int, bool).
    pub param_type: String,
    pub required: bool,
    pub description: String,
}

impl ParamSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            required: false,
            description: description.into(),
        }
    }
}

/// Schema describing a tool's interface.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSchema>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }
}

/// JSON arguments for one tool call, with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    object: serde_json::Map<String, Value>,
}

impl ToolArgs {
    /// Wrap a JSON value. Non-object values yield empty args.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(object) => Self { object },
            _ => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.object.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.object.get(name).and_then(Value::as_str)
    }

    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.object
            .get(name)
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.object.get(name).and_then(Value::as_bool)
    }
}

/// Text reply from a tool call. Error replies carry the message the agent
/// needs to correct its next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub content: String,
    pub is_error: bool,
}

impl ToolReply {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: message.to_string(),
            is_error: true,
        }
    }
}

/// A tool exposed to the calling agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's name (used for lookup).
    fn name(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    async fn execute(&self, args: ToolArgs) -> ToolReply;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_accessors() {
        let args = ToolArgs::from_value(json!({
            "path": "/a.txt",
            "offset": 5,
            "replace_all": true,
        }));
        assert_eq!(args.get_str("path"), Some("/a.txt"));
        assert_eq!(args.get_usize("offset"), Some(5));
        assert_eq!(args.get_bool("replace_all"), Some(true));
        assert_eq!(args.get_str("missing"), None);
    }

    #[test]
    fn non_object_value_yields_empty_args() {
        let args = ToolArgs::from_value(json!("just a string"));
        assert_eq!(args.get_str("path"), None);
    }
}

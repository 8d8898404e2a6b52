//! Tool registry for looking up and dispatching tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{Tool, ToolArgs, ToolReply, ToolSchema};

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// All tool schemas, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Dispatch one tool call. Unknown names come back as error replies,
    /// same as any other contract failure.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolReply {
        match self.get(name) {
            Some(tool) => tool.execute(ToolArgs::from_value(arguments)).await,
            None => ToolReply::error(format!("unknown tool: {name}")),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct DummyTool;

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            "dummy"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new("dummy", "does nothing")
        }

        async fn execute(&self, _args: ToolArgs) -> ToolReply {
            ToolReply::ok("done")
        }
    }

    #[tokio::test]
    async fn register_and_call() {
        let mut registry = ToolRegistry::new();
        registry.register(DummyTool);
        assert!(registry.contains("dummy"));
        assert_eq!(registry.names(), vec!["dummy"]);

        let reply = registry.call("dummy", json!({})).await;
        assert!(!reply.is_error);
        assert_eq!(reply.content, "done");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_reply() {
        let registry = ToolRegistry::new();
        let reply = registry.call("nope", json!({})).await;
        assert!(reply.is_error);
        assert!(reply.content.contains("nope"));
    }
}

//! The six filesystem tools: ls, read, write, edit, grep, glob.
//!
//! Each tool wraps one backend operation and renders the result as text.
//! The backend is shared behind an `Arc`, so one composite can serve every
//! tool.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ParamSchema, Tool, ToolArgs, ToolReply, ToolRegistry, ToolSchema};
use crate::backend::FileBackend;
use crate::config::ToolfsConfig;
use crate::search::SearchOptions;

/// Register all six filesystem tools against one backend.
pub fn register_fs_tools(
    registry: &mut ToolRegistry,
    backend: Arc<dyn FileBackend>,
    config: &ToolfsConfig,
) {
    registry.register(LsTool::new(Arc::clone(&backend)));
    registry.register(ReadTool::new(Arc::clone(&backend), config.read_limit));
    registry.register(WriteTool::new(Arc::clone(&backend)));
    registry.register(EditTool::new(Arc::clone(&backend)));
    registry.register(GrepTool::new(Arc::clone(&backend), config.clone()));
    registry.register(GlobTool::new(backend));
}

fn missing(param: &str) -> ToolReply {
    ToolReply::error(format!("missing required parameter: {param}"))
}

/// List a directory.
pub struct LsTool {
    backend: Arc<dyn FileBackend>,
}

impl LsTool {
    pub fn new(backend: Arc<dyn FileBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("ls", "List files and directories at a path")
            .param(ParamSchema::optional("path", "string", "Directory to list (default /)"))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let path = args.get_str("path").unwrap_or("/");
        match self.backend.ls_info(path).await {
            Ok(entries) if entries.is_empty() => ToolReply::ok("(empty directory)"),
            Ok(entries) => {
                let lines: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
                ToolReply::ok(lines.join("\n"))
            }
            Err(e) => ToolReply::error(e),
        }
    }
}

/// Read a page of a file with line numbers.
pub struct ReadTool {
    backend: Arc<dyn FileBackend>,
    default_limit: usize,
}

impl ReadTool {
    pub fn new(backend: Arc<dyn FileBackend>, default_limit: usize) -> Self {
        Self {
            backend,
            default_limit,
        }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("read_file", "Read a file with 1-based line numbers")
            .param(ParamSchema::required("path", "string", "File to read"))
            .param(ParamSchema::optional("offset", "int", "Line to start from, 0-based"))
            .param(ParamSchema::optional("limit", "int", "Maximum lines to return"))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let Some(path) = args.get_str("path") else {
            return missing("path");
        };
        let offset = args.get_usize("offset").unwrap_or(0);
        let limit = args.get_usize("limit").unwrap_or(self.default_limit);
        match self.backend.read(path, offset, limit).await {
            Ok(page) => ToolReply::ok(page),
            Err(e) => ToolReply::error(e),
        }
    }
}

/// Create a new file.
pub struct WriteTool {
    backend: Arc<dyn FileBackend>,
}

impl WriteTool {
    pub fn new(backend: Arc<dyn FileBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "write_file",
            "Create a new file; fails if the file already exists",
        )
        .param(ParamSchema::required("path", "string", "File to create"))
        .param(ParamSchema::required("content", "string", "File content"))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let Some(path) = args.get_str("path") else {
            return missing("path");
        };
        let Some(content) = args.get_str("content") else {
            return missing("content");
        };
        match self.backend.write(path, content).await {
            Ok(result) => ToolReply::ok(format!("Created {}", result.path)),
            Err(e) => ToolReply::error(e),
        }
    }
}

/// Occurrence-counted string replacement in an existing file.
pub struct EditTool {
    backend: Arc<dyn FileBackend>,
}

impl EditTool {
    pub fn new(backend: Arc<dyn FileBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("edit_file", "Replace a string in a file")
            .param(ParamSchema::required("path", "string", "File to edit"))
            .param(ParamSchema::required("old_string", "string", "Exact string to replace"))
            .param(ParamSchema::required("new_string", "string", "Replacement string"))
            .param(ParamSchema::optional(
                "replace_all",
                "bool",
                "Replace every occurrence instead of requiring uniqueness",
            ))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let Some(path) = args.get_str("path") else {
            return missing("path");
        };
        let Some(old_string) = args.get_str("old_string") else {
            return missing("old_string");
        };
        let Some(new_string) = args.get_str("new_string") else {
            return missing("new_string");
        };
        let replace_all = args.get_bool("replace_all").unwrap_or(false);

        match self
            .backend
            .edit(path, old_string, new_string, replace_all)
            .await
        {
            Ok(result) if result.occurrences == 0 => {
                ToolReply::ok(format!("Created {}", result.path))
            }
            Ok(result) => ToolReply::ok(format!(
                "Replaced {} occurrence{} in {}",
                result.occurrences,
                if result.occurrences == 1 { "" } else { "s" },
                result.path
            )),
            Err(e) => ToolReply::error(e),
        }
    }
}

/// Regex search, rendered as `path:line:text` lines.
pub struct GrepTool {
    backend: Arc<dyn FileBackend>,
    config: ToolfsConfig,
}

impl GrepTool {
    pub fn new(backend: Arc<dyn FileBackend>, config: ToolfsConfig) -> Self {
        Self { backend, config }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("grep", "Search file contents with a case-insensitive regex")
            .param(ParamSchema::required("pattern", "string", "Regex to search for"))
            .param(ParamSchema::optional("path", "string", "Directory to search (default /)"))
            .param(ParamSchema::optional("glob", "string", "Filter files by glob, e.g. *.ts"))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let Some(pattern) = args.get_str("pattern") else {
            return missing("pattern");
        };
        let base = args.get_str("path").unwrap_or("/");
        let glob = args.get_str("glob");
        let options = SearchOptions::from_config(&self.config);

        match self.backend.grep_raw(pattern, base, glob, &options).await {
            Ok(matches) if matches.is_empty() => ToolReply::ok("No matches found"),
            Ok(matches) => {
                let lines: Vec<String> = matches
                    .iter()
                    .map(|m| format!("{}:{}:{}", m.path, m.line, m.text))
                    .collect();
                ToolReply::ok(lines.join("\n"))
            }
            Err(e) => ToolReply::error(e),
        }
    }
}

/// List files matching a glob.
pub struct GlobTool {
    backend: Arc<dyn FileBackend>,
}

impl GlobTool {
    pub fn new(backend: Arc<dyn FileBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("glob", "List files matching a glob pattern")
            .param(ParamSchema::required("pattern", "string", "Glob, e.g. **/*.rs"))
            .param(ParamSchema::optional("path", "string", "Directory to search (default /)"))
    }

    async fn execute(&self, args: ToolArgs) -> ToolReply {
        let Some(pattern) = args.get_str("pattern") else {
            return missing("pattern");
        };
        let base = args.get_str("path").unwrap_or("/");
        match self.backend.glob_info(pattern, base).await {
            Ok(infos) if infos.is_empty() => ToolReply::ok("No files found"),
            Ok(infos) => {
                let lines: Vec<&str> = infos.iter().map(|i| i.path.as_str()).collect();
                ToolReply::ok(lines.join("\n"))
            }
            Err(e) => ToolReply::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let backend: Arc<dyn FileBackend> = Arc::new(MemoryBackend::new());
        let mut registry = ToolRegistry::new();
        register_fs_tools(&mut registry, backend, &ToolfsConfig::default());
        registry
    }

    #[tokio::test]
    async fn write_read_edit_through_tools() {
        let registry = registry();

        let reply = registry
            .call("write_file", json!({"path": "/a.txt", "content": "alpha\nbeta"}))
            .await;
        assert!(!reply.is_error, "{}", reply.content);
        assert_eq!(reply.content, "Created /a.txt");

        let reply = registry.call("read_file", json!({"path": "/a.txt"})).await;
        assert_eq!(reply.content, "     1\talpha\n     2\tbeta");

        let reply = registry
            .call(
                "edit_file",
                json!({"path": "/a.txt", "old_string": "beta", "new_string": "gamma"}),
            )
            .await;
        assert_eq!(reply.content, "Replaced 1 occurrence in /a.txt");
    }

    #[tokio::test]
    async fn contract_errors_are_error_replies() {
        let registry = registry();

        let reply = registry.call("read_file", json!({"path": "/missing.txt"})).await;
        assert!(reply.is_error);
        assert!(reply.content.contains("not found"));

        let reply = registry.call("read_file", json!({})).await;
        assert!(reply.is_error);
        assert!(reply.content.contains("path"));
    }

    #[tokio::test]
    async fn grep_renders_matches_or_sentinel() {
        let registry = registry();
        registry
            .call("write_file", json!({"path": "/src/x.ts", "content": "// TODO: fix\n"}))
            .await;

        let reply = registry
            .call("grep", json!({"pattern": "todo", "glob": "*.ts"}))
            .await;
        assert_eq!(reply.content, "/src/x.ts:1:// TODO: fix");

        let reply = registry.call("grep", json!({"pattern": "nomatch"})).await;
        assert_eq!(reply.content, "No matches found");
    }

    #[tokio::test]
    async fn glob_lists_matching_files() {
        let registry = registry();
        registry
            .call("write_file", json!({"path": "/src/a.rs", "content": "x"}))
            .await;
        registry
            .call("write_file", json!({"path": "/src/b.ts", "content": "x"}))
            .await;

        let reply = registry.call("glob", json!({"pattern": "**/*.rs"})).await;
        assert_eq!(reply.content, "/src/a.rs");
    }
}

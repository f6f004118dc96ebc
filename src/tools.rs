//! Tool surface exposed to the orchestrating agent.
//!
//! Every tool takes a JSON argument object and returns a JSON-serializable
//! outcome distinguishing "success, possibly empty" from "operation could
//! not be performed".

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::indexer::CodeIndexer;
use crate::types::{SearchOptions, SymbolKind};

/// Descriptor of one tool: name, description and JSON input schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            data: json!({}),
            error: Some(message),
        }
    }
}

/// Agent-facing wrapper around the indexer.
pub struct AnalysisTools {
    indexer: Arc<CodeIndexer>,
}

impl AnalysisTools {
    pub fn new(indexer: Arc<CodeIndexer>) -> Self {
        Self { indexer }
    }

    pub fn tool_schemas() -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: "initialise".to_string(),
                description: "Report the analyser's cache directory (call before other tools)".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolSchema {
                name: "set_project_path".to_string(),
                description: "Set the project path and build the initial index".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Absolute path to the project directory"}
                    },
                    "required": ["path"]
                }),
            },
            ToolSchema {
                name: "find_files".to_string(),
                description: "Find indexed files matching a glob pattern".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "Glob pattern (e.g. '*.java', '**/*.ts', 'UserService.java')"}
                    },
                    "required": ["pattern"]
                }),
            },
            ToolSchema {
                name: "search_code".to_string(),
                description: "Search file contents with the best available external engine (ugrep, rg, ag or grep)".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "Text or regex pattern to search for"},
                        "case_sensitive": {"type": "boolean", "description": "Case-sensitive search", "default": true},
                        "context_lines": {"type": "integer", "description": "Lines of context before/after each match", "default": 0},
                        "file_pattern": {"type": "string", "description": "Glob limiting the search to matching files"},
                        "fuzzy": {"type": "boolean", "description": "Fuzzy matching (ugrep only)", "default": false},
                        "regex": {"type": "boolean", "description": "Treat the pattern as a regular expression", "default": false},
                        "max_line_length": {"type": "integer", "description": "Maximum line length to display"}
                    },
                    "required": ["pattern"]
                }),
            },
            ToolSchema {
                name: "analyse_file".to_string(),
                description: "Get the indexed analysis of one file: metadata plus its symbols".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path to the file, relative to the project root"}
                    },
                    "required": ["file_path"]
                }),
            },
            ToolSchema {
                name: "get_project_structure".to_string(),
                description: "Get the project directory structure as a tree".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolSchema {
                name: "get_statistics".to_string(),
                description: "Get file, line and symbol statistics plus search-tool availability".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolSchema {
                name: "refresh_index".to_string(),
                description: "Rebuild the project index without restarting the watcher".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolSchema {
                name: "find_symbol_usage".to_string(),
                description: "Find symbols by name (exact, member suffix or substring match)".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "symbol_name": {"type": "string", "description": "Name of the symbol to find"},
                        "symbol_type": {"type": "string", "enum": ["class", "interface", "method", "function"], "description": "Optional kind filter"}
                    },
                    "required": ["symbol_name"]
                }),
            },
            ToolSchema {
                name: "find_functions_calling".to_string(),
                description: "List the functions recorded as callers of the named function".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "function_name": {"type": "string", "description": "Name of the function to analyse"}
                    },
                    "required": ["function_name"]
                }),
            },
            ToolSchema {
                name: "get_file_imports".to_string(),
                description: "Get imports, exports and package for one indexed file".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path to the file, relative to the project root"}
                    },
                    "required": ["file_path"]
                }),
            },
            ToolSchema {
                name: "search_in_file".to_string(),
                description: "Search for a pattern within a single file".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path to the file, relative to the project root"},
                        "pattern": {"type": "string", "description": "Pattern to search for"},
                        "regex": {"type": "boolean", "description": "Treat the pattern as a regular expression", "default": false}
                    },
                    "required": ["file_path", "pattern"]
                }),
            },
            ToolSchema {
                name: "shutdown".to_string(),
                description: "Stop the file watcher and release resources".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    pub async fn execute_tool(&self, tool_name: &str, input: Value) -> Result<ToolOutcome> {
        match tool_name {
            "initialise" => Ok(self.initialise()),
            "set_project_path" => self.set_project_path(input).await,
            "find_files" => self.find_files(input),
            "search_code" => self.search_code(input),
            "analyse_file" => self.analyse_file(input),
            "get_project_structure" => Ok(self.project_structure()),
            "get_statistics" => Ok(self.statistics()),
            "refresh_index" => self.refresh_index().await,
            "find_symbol_usage" => self.symbol_usage(input),
            "find_functions_calling" => self.functions_calling(input),
            "get_file_imports" => self.file_imports(input),
            "search_in_file" => self.search_in_file(input),
            "shutdown" => {
                self.indexer.shutdown();
                Ok(ToolOutcome::success(json!({"message": "indexer shut down"})))
            }
            _ => Ok(ToolOutcome::failure(format!("unknown tool: {tool_name}"))),
        }
    }

    fn initialise(&self) -> ToolOutcome {
        ToolOutcome::success(json!({
            "message": "code analyser initialised",
            "cache_dir": self.indexer.cache_dir(),
        }))
    }

    async fn set_project_path(&self, input: Value) -> Result<ToolOutcome> {
        let args: SetProjectPathInput =
            serde_json::from_value(input).context("invalid set_project_path input")?;
        let indexer = Arc::clone(&self.indexer);
        let path = args.path.clone();
        // The walk and parse block; keep them off the async executor.
        let outcome = tokio::task::spawn_blocking(move || indexer.set_project_path(Path::new(&path)))
            .await
            .context("indexing task failed")?;

        Ok(match outcome {
            Ok(report) => ToolOutcome::success(json!({
                "message": format!("project initialised at {}", args.path),
                "file_count": report.file_count,
                "build_time_ms": report.build_time_ms,
            })),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }

    async fn refresh_index(&self) -> Result<ToolOutcome> {
        let indexer = Arc::clone(&self.indexer);
        let outcome = tokio::task::spawn_blocking(move || indexer.refresh_index())
            .await
            .context("indexing task failed")?;

        Ok(match outcome {
            Ok(report) => ToolOutcome::success(json!({
                "message": "index refreshed",
                "file_count": report.file_count,
                "build_time_ms": report.build_time_ms,
            })),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }

    fn find_files(&self, input: Value) -> Result<ToolOutcome> {
        let args: FindFilesInput = serde_json::from_value(input).context("invalid find_files input")?;
        let files = self.indexer.find_files(&args.pattern);
        let total = files.len();
        Ok(ToolOutcome::success(json!({
            "pattern": args.pattern,
            "files": files,
            "total_matches": total,
        })))
    }

    fn search_code(&self, input: Value) -> Result<ToolOutcome> {
        let args: SearchCodeInput = serde_json::from_value(input).context("invalid search_code input")?;
        let options = SearchOptions {
            case_sensitive: args.case_sensitive.unwrap_or(true),
            context_lines: args.context_lines.unwrap_or(0),
            file_pattern: args.file_pattern,
            fuzzy: args.fuzzy.unwrap_or(false),
            regex: args.regex.unwrap_or(false),
            max_line_length: args.max_line_length,
        };
        Ok(match self.indexer.search_code(&args.pattern, &options) {
            Ok(report) => ToolOutcome::success(serde_json::to_value(report)?),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }

    fn analyse_file(&self, input: Value) -> Result<ToolOutcome> {
        let args: FilePathInput = serde_json::from_value(input).context("invalid analyse_file input")?;
        Ok(match self.indexer.analyse_file(&args.file_path) {
            Ok(analysis) => ToolOutcome::success(serde_json::to_value(analysis)?),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }

    fn project_structure(&self) -> ToolOutcome {
        match serde_json::to_value(self.indexer.get_project_structure()) {
            Ok(data) => ToolOutcome::success(data),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }

    fn statistics(&self) -> ToolOutcome {
        match serde_json::to_value(self.indexer.get_statistics()) {
            Ok(data) => ToolOutcome::success(data),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }

    fn symbol_usage(&self, input: Value) -> Result<ToolOutcome> {
        let args: SymbolUsageInput =
            serde_json::from_value(input).context("invalid find_symbol_usage input")?;
        let matches = self.indexer.find_symbol_usage(&args.symbol_name, args.symbol_type);
        let total = matches.len();
        Ok(ToolOutcome::success(json!({
            "symbol_name": args.symbol_name,
            "matches": matches,
            "total_matches": total,
        })))
    }

    fn functions_calling(&self, input: Value) -> Result<ToolOutcome> {
        let args: FunctionsCallingInput =
            serde_json::from_value(input).context("invalid find_functions_calling input")?;
        let report = self.indexer.find_functions_calling(&args.function_name);
        let total = report.callers.len();
        let mut data = serde_json::to_value(&report)?;
        if let Some(object) = data.as_object_mut() {
            object.insert("function_name".into(), json!(args.function_name));
            object.insert("total_callers".into(), json!(total));
        }
        Ok(ToolOutcome::success(data))
    }

    fn file_imports(&self, input: Value) -> Result<ToolOutcome> {
        let args: FilePathInput = serde_json::from_value(input).context("invalid get_file_imports input")?;
        Ok(match self.indexer.get_file_imports(&args.file_path) {
            Ok(imports) => ToolOutcome::success(serde_json::to_value(imports)?),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }

    fn search_in_file(&self, input: Value) -> Result<ToolOutcome> {
        let args: SearchInFileInput =
            serde_json::from_value(input).context("invalid search_in_file input")?;
        let regex = args.regex.unwrap_or(false);
        Ok(match self.indexer.search_in_file(&args.file_path, &args.pattern, regex) {
            Ok(report) => ToolOutcome::success(serde_json::to_value(report)?),
            Err(e) => ToolOutcome::failure(e.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SetProjectPathInput {
    path: String,
}

#[derive(Debug, Deserialize)]
struct FindFilesInput {
    pattern: String,
}

#[derive(Debug, Deserialize)]
struct SearchCodeInput {
    pattern: String,
    case_sensitive: Option<bool>,
    context_lines: Option<u32>,
    file_pattern: Option<String>,
    fuzzy: Option<bool>,
    regex: Option<bool>,
    max_line_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FilePathInput {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct SymbolUsageInput {
    symbol_name: String,
    symbol_type: Option<SymbolKind>,
}

#[derive(Debug, Deserialize)]
struct FunctionsCallingInput {
    function_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchInFileInput {
    file_path: String,
    pattern: String,
    regex: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::search::SearchTool;
    use std::fs;
    use tempfile::TempDir;

    fn tools_for(cache: &TempDir) -> AnalysisTools {
        let config = IndexerConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            watch: false,
        };
        AnalysisTools::new(Arc::new(CodeIndexer::new(&config).unwrap()))
    }

    #[test]
    fn schemas_cover_the_whole_surface() {
        let schemas = AnalysisTools::tool_schemas();
        let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        for expected in [
            "initialise",
            "set_project_path",
            "find_files",
            "search_code",
            "analyse_file",
            "get_project_structure",
            "get_statistics",
            "refresh_index",
            "find_symbol_usage",
            "find_functions_calling",
            "get_file_imports",
            "search_in_file",
            "shutdown",
        ] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }
        for schema in &schemas {
            assert!(schema.input_schema.is_object());
            assert!(!schema.description.is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure_outcome() {
        let cache = TempDir::new().unwrap();
        let tools = tools_for(&cache);
        let outcome = tools.execute_tool("does_not_exist", json!({})).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn initialise_reports_the_cache_dir() {
        let cache = TempDir::new().unwrap();
        let tools = tools_for(&cache);
        let outcome = tools.execute_tool("initialise", json!({})).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.data["cache_dir"].as_str().is_some());
    }

    #[tokio::test]
    async fn set_project_path_reports_counts_and_errors() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("A.java"), "class A {}\n").unwrap();
        let tools = tools_for(&cache);

        let outcome = tools
            .execute_tool("set_project_path", json!({"path": project.path()}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data["file_count"], 1);

        let outcome = tools
            .execute_tool("set_project_path", json!({"path": "/definitely/not/here"}))
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn query_tools_round_trip_through_json() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("Order.java"),
            "class Order { void confirm() { ship(); } void ship() {} }\n",
        )
        .unwrap();
        let tools = tools_for(&cache);
        tools
            .execute_tool("set_project_path", json!({"path": project.path()}))
            .await
            .unwrap();

        let files = tools.execute_tool("find_files", json!({"pattern": "*.java"})).await.unwrap();
        assert!(files.success);
        assert_eq!(files.data["total_matches"], 1);

        let usage = tools
            .execute_tool("find_symbol_usage", json!({"symbol_name": "Order", "symbol_type": "class"}))
            .await
            .unwrap();
        assert!(usage.success);
        assert_eq!(usage.data["total_matches"], 1);

        let callers = tools
            .execute_tool("find_functions_calling", json!({"function_name": "ship"}))
            .await
            .unwrap();
        assert!(callers.success);
        assert_eq!(callers.data["total_callers"], 1);
        assert_eq!(callers.data["callers"][0]["symbol_name"], "Order.confirm");

        let analysis = tools
            .execute_tool("analyse_file", json!({"file_path": "Order.java"}))
            .await
            .unwrap();
        assert!(analysis.success);
        assert_eq!(analysis.data["file_record"]["classes"][0], "Order");

        let missing = tools
            .execute_tool("analyse_file", json!({"file_path": "Missing.java"}))
            .await
            .unwrap();
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn zero_search_matches_is_success_not_failure() {
        if SearchTool::detect().available().is_empty() {
            return; // no external engine on this machine
        }
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("A.java"), "class A {}\n").unwrap();
        let tools = tools_for(&cache);
        tools
            .execute_tool("set_project_path", json!({"path": project.path()}))
            .await
            .unwrap();

        let outcome = tools
            .execute_tool("search_code", json!({"pattern": "absent_token_zzz"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data["total_matches"], 0);
    }
}

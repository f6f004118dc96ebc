use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::IndexerConfig;
use crate::indexer::CodeIndexer;
use crate::tools::AnalysisTools;
use crate::types::{SearchOptions, SymbolKind};

#[derive(Parser)]
#[command(name = "codeatlas", version, about = "Source-code indexing and analysis for AI coding agents")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, env = "CODEATLAS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the index for a project directory and print statistics.
    Index { path: PathBuf },
    /// Search file contents with the best available external engine.
    Search {
        path: PathBuf,
        pattern: String,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        #[arg(short = 'C', long, default_value_t = 0)]
        context: u32,
        #[arg(long)]
        glob: Option<String>,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        fuzzy: bool,
    },
    /// Find indexed files matching a glob pattern.
    Find { path: PathBuf, pattern: String },
    /// Show the indexed analysis of one file.
    Analyze { path: PathBuf, file: String },
    /// Print the project structure as a tree.
    Tree { path: PathBuf },
    /// Print index statistics.
    Stats { path: PathBuf },
    /// List the functions calling the named function.
    Callers { path: PathBuf, name: String },
    /// Find symbols by name.
    Usage {
        path: PathBuf,
        name: String,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<SymbolKind>,
    },
    /// Show imports, exports and package of one file.
    Imports { path: PathBuf, file: String },
    /// Print the JSON schemas of the agent tool surface.
    Schemas,
    /// Execute one agent tool by name with a JSON argument object.
    Tool {
        path: PathBuf,
        name: String,
        #[arg(default_value = "{}")]
        input: String,
    },
}

fn parse_kind(value: &str) -> std::result::Result<SymbolKind, String> {
    match value {
        "class" => Ok(SymbolKind::Class),
        "interface" => Ok(SymbolKind::Interface),
        "method" => Ok(SymbolKind::Method),
        "function" => Ok(SymbolKind::Function),
        other => Err(format!("unknown symbol kind: {other}")),
    }
}

pub struct CliApp {
    indexer: Arc<CodeIndexer>,
}

impl CliApp {
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let indexer = CodeIndexer::new(&config).context("failed to initialise indexer")?;
        Ok(Self {
            indexer: Arc::new(indexer),
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Index { path } => {
                let report = self.indexer.set_project_path(&path)?;
                info!(files = report.file_count, ms = report.build_time_ms, "index built");
                print_json(&self.indexer.get_statistics())?;
            }
            Command::Search {
                path,
                pattern,
                ignore_case,
                context,
                glob,
                regex,
                fuzzy,
            } => {
                self.indexer.set_project_path(&path)?;
                let options = SearchOptions {
                    case_sensitive: !ignore_case,
                    context_lines: context,
                    file_pattern: glob,
                    fuzzy,
                    regex,
                    max_line_length: None,
                };
                print_json(&self.indexer.search_code(&pattern, &options)?)?;
            }
            Command::Find { path, pattern } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.find_files(&pattern))?;
            }
            Command::Analyze { path, file } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.analyse_file(&file)?)?;
            }
            Command::Tree { path } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.get_project_structure())?;
            }
            Command::Stats { path } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.get_statistics())?;
            }
            Command::Callers { path, name } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.find_functions_calling(&name))?;
            }
            Command::Usage { path, name, kind } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.find_symbol_usage(&name, kind))?;
            }
            Command::Imports { path, file } => {
                self.indexer.set_project_path(&path)?;
                print_json(&self.indexer.get_file_imports(&file)?)?;
            }
            Command::Schemas => {
                print_json(&AnalysisTools::tool_schemas())?;
            }
            Command::Tool { path, name, input } => {
                self.indexer.set_project_path(&path)?;
                let tools = AnalysisTools::new(Arc::clone(&self.indexer));
                let value = serde_json::from_str(&input).context("invalid tool input JSON")?;
                print_json(&tools.execute_tool(&name, value).await?)?;
            }
        }
        self.indexer.shutdown();
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

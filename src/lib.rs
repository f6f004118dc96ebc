pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod indexer;
pub mod parsers;
pub mod search;
pub mod tools;
pub mod types;
pub mod watcher;

// Re-export commonly used types
pub use config::IndexerConfig;
pub use errors::{IndexError, Result};
pub use graph::{find_functions_calling, find_symbol_usage, CallerReport, SymbolMatch};
pub use indexer::{
    BuildReport, CodeIndex, CodeIndexer, FileAnalysis, FileImports, FileSearchReport,
    ProjectStructure, SearchReport, Statistics,
};
pub use parsers::{EcmaParser, JavaParser, LanguageParser, ParseOutcome, ParserRegistry};
pub use search::{SearchEngine, SearchTool};
pub use tools::{AnalysisTools, ToolOutcome, ToolSchema};
pub use types::*;
pub use watcher::{FileEvent, FileWatcher};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

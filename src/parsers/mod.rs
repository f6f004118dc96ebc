//! Language parsing strategies.
//!
//! Each strategy runs a single depth-first traversal over the tree-sitter
//! AST, carrying the innermost enclosing type name and the innermost
//! enclosing method/function as context. Call edges resolve through a
//! lookup table that fills in traversal order; members of a type are
//! pre-registered when the type is entered, so calls between members
//! resolve regardless of declaration order, but file-level forward
//! references stay unresolved. That is a deliberate best-effort trade,
//! not a bug.

mod ecma;
mod java;

pub use ecma::EcmaParser;
pub use java::JavaParser;

use std::collections::BTreeMap;
use std::path::Path;

use tree_sitter::Node;

use crate::errors::{IndexError, Result};
use crate::types::{FileRecord, Language, Symbol, SymbolId};

/// Result of parsing one file: its symbols and file-level metadata.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub symbols: BTreeMap<SymbolId, Symbol>,
    pub record: FileRecord,
}

/// Contract shared by all parsing strategies.
///
/// `parse` is pure with respect to external state. Malformed source yields
/// a partial result (tree-sitter recovers around errors); a wholly failed
/// parse is reported as `ParseFailure` for the indexer to absorb, never a
/// panic.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    fn parse(&self, rel_path: &str, content: &str) -> Result<ParseOutcome>;
}

/// Dispatches files to the strategy for their extension.
pub struct ParserRegistry {
    java: JavaParser,
    typescript: EcmaParser,
    tsx: EcmaParser,
    javascript: EcmaParser,
}

impl ParserRegistry {
    /// Loads every grammar up front; a grammar that cannot load is fatal
    /// here rather than at parse time.
    pub fn new() -> Result<Self> {
        Ok(Self {
            java: JavaParser::new()?,
            typescript: EcmaParser::typescript()?,
            tsx: EcmaParser::tsx()?,
            javascript: EcmaParser::javascript()?,
        })
    }

    pub fn parser_for(&self, path: &Path) -> Option<&dyn LanguageParser> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "java" => Some(&self.java),
            "ts" => Some(&self.typescript),
            "tsx" => Some(&self.tsx),
            "js" | "jsx" => Some(&self.javascript),
            _ => None,
        }
    }

    pub fn parse(&self, rel_path: &str, content: &str) -> Result<ParseOutcome> {
        let parser = self
            .parser_for(Path::new(rel_path))
            .ok_or_else(|| IndexError::UnsupportedLanguage(rel_path.to_owned()))?;
        parser.parse(rel_path, content)
    }
}

pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.utf8_text(source.as_bytes()).ok()
}

pub(crate) fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(child, source))
        .map(str::to_owned)
}

/// First-line rendering of a declaration, used as its signature.
pub(crate) fn first_line_signature(node: Node<'_>, source: &str) -> Option<String> {
    node_text(node, source)
        .and_then(|text| text.lines().next())
        .map(|line| line.trim().to_owned())
}

pub(crate) fn qualify(enclosing_type: Option<&str>, name: &str) -> String {
    match enclosing_type {
        Some(type_name) => format!("{type_name}.{name}"),
        None => name.to_owned(),
    }
}

pub(crate) fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

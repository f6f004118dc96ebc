use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an indexed declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Interface,
    Method,
    Function,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Method => "method",
            SymbolKind::Function => "function",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a symbol: project-relative file path plus qualified
/// name, rendered as `<path>::<qualified_name>`.
///
/// Qualified names are `EnclosingType.member` for members and the bare
/// identifier otherwise; neither half contains `::`, so the separator is
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(file: &str, qualified_name: &str) -> Self {
        Self(format!("{file}::{qualified_name}"))
    }

    pub fn file(&self) -> &str {
        self.0.split_once("::").map(|(file, _)| file).unwrap_or(&self.0)
    }

    pub fn qualified_name(&self) -> &str {
        self.0.split_once("::").map(|(_, name)| name).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An indexed declaration with its location and call-graph edges.
///
/// `called_by` holds the ids of symbols whose bodies invoke this one,
/// resolved best-effort during the declaring file's traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Project-relative path of the declaring file.
    pub file: String,
    /// 1-based line of the declaration.
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub called_by: BTreeSet<SymbolId>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, file: &str, line: u32) -> Self {
        Self {
            kind,
            file: file.to_owned(),
            line,
            signature: None,
            called_by: BTreeSet::new(),
        }
    }
}

//! Usage and call-graph lookups layered on the index.

use serde::Serialize;

use crate::indexer::CodeIndex;
use crate::types::{Symbol, SymbolId, SymbolKind};

/// One matched symbol, flattened for the tool surface.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatch {
    pub symbol_id: SymbolId,
    pub symbol_name: String,
    #[serde(flatten)]
    pub symbol: Symbol,
}

impl SymbolMatch {
    fn new(id: &SymbolId, symbol: &Symbol) -> Self {
        Self {
            symbol_id: id.clone(),
            symbol_name: id.qualified_name().to_owned(),
            symbol: symbol.clone(),
        }
    }
}

/// Result of a called-by lookup. An unresolved target is a successful,
/// empty result with an explanatory message, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct CallerReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<SymbolId>,
    pub callers: Vec<SymbolMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Deliberately permissive name matching: exact qualified name, `.name`
/// member suffix, or case-insensitive substring.
fn name_matches(qualified: &str, name: &str) -> bool {
    qualified == name
        || qualified.ends_with(&format!(".{name}"))
        || qualified.to_lowercase().contains(&name.to_lowercase())
}

pub fn find_symbol_usage(index: &CodeIndex, name: &str, kind: Option<SymbolKind>) -> Vec<SymbolMatch> {
    index
        .symbols
        .iter()
        .filter(|(id, symbol)| {
            name_matches(id.qualified_name(), name) && kind.map(|k| symbol.kind == k).unwrap_or(true)
        })
        .map(|(id, symbol)| SymbolMatch::new(id, symbol))
        .collect()
}

pub fn find_functions_calling(index: &CodeIndex, name: &str) -> CallerReport {
    let target = index
        .symbols
        .iter()
        .find(|(id, _)| name_matches(id.qualified_name(), name))
        .map(|(id, _)| id.clone());

    let Some(target_id) = target else {
        return CallerReport {
            target: None,
            callers: Vec::new(),
            message: Some(format!("function not found in index: {name}")),
        };
    };

    let callers = index
        .symbols
        .get(&target_id)
        .map(|symbol| {
            symbol
                .called_by
                .iter()
                .filter_map(|caller_id| index.symbols.get(caller_id).map(|caller| SymbolMatch::new(caller_id, caller)))
                .collect()
        })
        .unwrap_or_default();

    CallerReport {
        target: Some(target_id),
        callers,
        message: None,
    }
}

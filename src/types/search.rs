use serde::{Deserialize, Serialize};

/// One matching line from an external search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file: String,
    pub line_number: u32,
    pub line_content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_after: Vec<String>,
}

impl SearchResult {
    pub fn new(file: String, line_number: u32, line_content: String) -> Self {
        Self {
            file,
            line_number,
            line_content,
            context_before: Vec::new(),
            context_after: Vec::new(),
        }
    }
}

/// Options forwarded to the external search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub context_lines: u32,
    pub file_pattern: Option<String>,
    /// Fuzzy matching; only ugrep supports it, other engines ignore it.
    pub fuzzy: bool,
    pub regex: bool,
    pub max_line_length: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            context_lines: 0,
            file_pattern: None,
            fuzzy: false,
            regex: false,
            max_line_length: None,
        }
    }
}

/// One matching line from an in-file scan (`search_in_file`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMatch {
    pub line_number: u32,
    pub line_content: String,
    /// Byte offset of the match within the line.
    pub match_start: usize,
}

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages the indexer can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    TypeScript,
    JavaScript,
}

impl Language {
    /// Detect the language from a file extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "java" => Some(Language::Java),
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" => Some(Language::JavaScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
        }
    }
}

/// Per-file metadata produced by a parse, keyed in the index by
/// project-relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub language: Language,
    pub line_count: u32,
    /// Qualified method/function names declared in the file.
    pub functions: Vec<String>,
    /// Class and interface names declared in the file.
    pub classes: Vec<String>,
    /// Import statements in raw textual form.
    pub imports: Vec<String>,
    /// Export statements (ECMAScript dialects only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    /// Package declaration (Java only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection_by_extension() {
        assert_eq!(Language::from_path(Path::new("src/Foo.java")), Some(Language::Java));
        assert_eq!(Language::from_path(Path::new("app.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("index.jsx")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }
}

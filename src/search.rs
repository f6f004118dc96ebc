use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::debug;

use crate::errors::{IndexError, Result};
use crate::types::{SearchOptions, SearchResult};

/// External text-search engines, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchEngine {
    #[serde(rename = "ugrep")]
    Ugrep,
    #[serde(rename = "rg")]
    Ripgrep,
    #[serde(rename = "ag")]
    SilverSearcher,
    #[serde(rename = "grep")]
    Grep,
}

impl SearchEngine {
    pub const PREFERENCE_ORDER: [SearchEngine; 4] = [
        SearchEngine::Ugrep,
        SearchEngine::Ripgrep,
        SearchEngine::SilverSearcher,
        SearchEngine::Grep,
    ];

    pub fn command(self) -> &'static str {
        match self {
            SearchEngine::Ugrep => "ugrep",
            SearchEngine::Ripgrep => "rg",
            SearchEngine::SilverSearcher => "ag",
            SearchEngine::Grep => "grep",
        }
    }

    fn is_available(self) -> bool {
        Command::new(self.command())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn build_args(self, pattern: &str, base_path: &Path, options: &SearchOptions) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            SearchEngine::Ugrep => {
                args.push("-rn".into());
                if !options.case_sensitive {
                    args.push("-i".into());
                }
                if options.context_lines > 0 {
                    let n = options.context_lines.to_string();
                    args.extend(["-A".into(), n.clone(), "-B".into(), n]);
                }
                if let Some(glob) = &options.file_pattern {
                    args.extend(["--include".into(), glob.clone()]);
                }
                if options.fuzzy {
                    args.push("--fuzzy".into());
                }
                if options.regex {
                    args.push("-E".into());
                }
                if let Some(max) = options.max_line_length {
                    args.extend(["--max-line-length".into(), max.to_string()]);
                }
            }
            SearchEngine::Ripgrep => {
                args.push("-n".into());
                if !options.case_sensitive {
                    args.push("-i".into());
                }
                if options.context_lines > 0 {
                    let n = options.context_lines.to_string();
                    args.extend(["-A".into(), n.clone(), "-B".into(), n]);
                }
                if let Some(glob) = &options.file_pattern {
                    args.extend(["-g".into(), glob.clone()]);
                }
                if let Some(max) = options.max_line_length {
                    args.extend(["-M".into(), max.to_string()]);
                }
                if options.regex {
                    args.push("-e".into());
                }
            }
            SearchEngine::SilverSearcher => {
                args.push("--line-numbers".into());
                if !options.case_sensitive {
                    args.push("-i".into());
                }
                if options.context_lines > 0 {
                    let n = options.context_lines.to_string();
                    args.extend(["-A".into(), n.clone(), "-B".into(), n]);
                }
                if let Some(glob) = &options.file_pattern {
                    args.extend(["--file-search-regex".into(), glob.clone()]);
                }
            }
            SearchEngine::Grep => {
                args.push("-rn".into());
                if !options.case_sensitive {
                    args.push("-i".into());
                }
                if options.context_lines > 0 {
                    let n = options.context_lines.to_string();
                    args.extend(["-A".into(), n.clone(), "-B".into(), n]);
                }
                if options.regex {
                    args.push("-E".into());
                }
                if let Some(glob) = &options.file_pattern {
                    args.extend(["--include".into(), glob.clone()]);
                }
            }
        }
        args.push(pattern.to_owned());
        args.push(base_path.to_string_lossy().into_owned());
        args
    }
}

/// Probes for available engines once at construction; the first available
/// in preference order serves every call for the process lifetime.
#[derive(Debug, Clone)]
pub struct SearchTool {
    available: Vec<SearchEngine>,
    preferred: SearchEngine,
}

impl SearchTool {
    pub fn detect() -> Self {
        let available: Vec<SearchEngine> = SearchEngine::PREFERENCE_ORDER
            .into_iter()
            .filter(|engine| engine.is_available())
            .collect();
        let preferred = available.first().copied().unwrap_or(SearchEngine::Grep);
        debug!(?available, ?preferred, "detected search engines");
        Self { available, preferred }
    }

    pub fn available(&self) -> &[SearchEngine] {
        &self.available
    }

    pub fn preferred(&self) -> SearchEngine {
        self.preferred
    }

    /// Run the preferred engine. Exit code 1 is the grep-family "no match"
    /// convention and yields an empty result; any other non-zero exit is a
    /// `SearchFailed` carrying stderr.
    pub fn search(&self, pattern: &str, base_path: &Path, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let args = self.preferred.build_args(pattern, base_path, options);
        let output = Command::new(self.preferred.command()).args(&args).output()?;

        if output.status.success() {
            return Ok(parse_output(&String::from_utf8_lossy(&output.stdout)));
        }
        if output.status.code() == Some(1) {
            return Ok(Vec::new());
        }
        Err(IndexError::SearchFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ))
    }
}

/// Split `file:line:content` rows on the first two colons; anything else
/// (context separators, binary-file notices) is dropped.
fn parse_output(stdout: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for line in stdout.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(number), Some(content)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(line_number) = number.parse::<u32>() else {
            continue;
        };
        results.push(SearchResult::new(file.to_owned(), line_number, content.to_owned()));
    }
    results
}

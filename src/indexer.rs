//! The code indexer: owns the index, dispatches to parsers, persists
//! snapshots, answers structural and statistical queries, and coordinates
//! the file watcher.
//!
//! The index is the only shared mutable structure. It sits behind one
//! reader/writer lock; the watcher thread is the sole writer outside
//! explicit rebuild calls, and rebuilds hold the write lock for the whole
//! walk so queries never observe a half-built index.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use globset::Glob;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{IndexerConfig, IGNORED_DIRS};
use crate::errors::{IndexError, Result};
use crate::graph::{self, CallerReport, SymbolMatch};
use crate::parsers::{ParseOutcome, ParserRegistry};
use crate::search::{SearchEngine, SearchTool};
use crate::types::{FileMatch, FileRecord, SearchOptions, SearchResult, Symbol, SymbolId, SymbolKind};
use crate::watcher::{FileEvent, FileWatcher, WATCHED_EXTENSIONS};

/// The full project index.
///
/// Invariant: every path in `file_list` has a `files` entry and vice
/// versa, and every symbol's `file` names a path in `file_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeIndex {
    pub files: BTreeMap<String, FileRecord>,
    pub symbols: BTreeMap<SymbolId, Symbol>,
    pub file_list: BTreeSet<String>,
}

impl CodeIndex {
    /// Replace one file's record and symbols in place. Old symbols for the
    /// path are removed first, so re-indexing replaces rather than
    /// accumulates.
    pub fn insert_file(&mut self, rel_path: &str, outcome: ParseOutcome) {
        self.symbols.retain(|_, symbol| symbol.file != rel_path);
        self.files.insert(rel_path.to_owned(), outcome.record);
        self.file_list.insert(rel_path.to_owned());
        self.symbols.extend(outcome.symbols);
    }

    /// Remove a file along with its symbols, stripping any call edges that
    /// pointed at them.
    pub fn remove_file(&mut self, rel_path: &str) {
        self.files.remove(rel_path);
        self.file_list.remove(rel_path);

        let removed: BTreeSet<SymbolId> = self
            .symbols
            .iter()
            .filter(|(_, symbol)| symbol.file == rel_path)
            .map(|(id, _)| id.clone())
            .collect();
        if removed.is_empty() {
            return;
        }
        self.symbols.retain(|id, _| !removed.contains(id));
        for symbol in self.symbols.values_mut() {
            symbol.called_by.retain(|caller| !removed.contains(caller));
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub file_count: usize,
    pub build_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file: String,
    #[serde(rename = "file_record")]
    pub record: FileRecord,
    pub symbols: BTreeMap<SymbolId, Symbol>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub total_matches: usize,
    pub tool_used: SearchEngine,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStructure {
    pub tree: Value,
    pub total_files: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LanguageStats {
    pub files: usize,
    pub lines: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_files: usize,
    pub total_lines: u64,
    pub languages: BTreeMap<String, LanguageStats>,
    pub symbols: BTreeMap<String, usize>,
    pub available_tools: Vec<SearchEngine>,
    pub preferred_tool: SearchEngine,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileImports {
    pub file: String,
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub total_imports: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSearchReport {
    pub file: String,
    pub pattern: String,
    pub matches: Vec<FileMatch>,
    pub total_matches: usize,
}

/// Orchestrates parsing, watching, persistence and queries.
///
/// All operations take `&self`; the index lives behind a reader/writer
/// lock so one `Arc<CodeIndexer>` serves the watcher thread, the tool
/// layer and the CLI.
pub struct CodeIndexer {
    state: Arc<IndexerState>,
    watcher: Mutex<Option<FileWatcher>>,
    watch_enabled: bool,
}

pub(crate) struct IndexerState {
    cache_dir: PathBuf,
    base_path: RwLock<Option<PathBuf>>,
    index: RwLock<CodeIndex>,
    parsers: ParserRegistry,
    search: SearchTool,
}

impl CodeIndexer {
    pub fn new(config: &IndexerConfig) -> Result<Self> {
        let cache_dir = config.cache_dir();
        fs::create_dir_all(&cache_dir)?;
        let state = Arc::new(IndexerState {
            cache_dir,
            base_path: RwLock::new(None),
            index: RwLock::new(CodeIndex::default()),
            parsers: ParserRegistry::new()?,
            search: SearchTool::detect(),
        });
        Ok(Self {
            state,
            watcher: Mutex::new(None),
            watch_enabled: config.watch,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.state.cache_dir
    }

    pub fn project_path(&self) -> Option<PathBuf> {
        self.state.base_path.read().clone()
    }

    /// Set the project root, rebuild the index from disk, persist the
    /// snapshot and (re)start the watcher. Blocks for the duration of the
    /// walk and parse.
    pub fn set_project_path(&self, path: &Path) -> Result<BuildReport> {
        if !path.is_dir() {
            return Err(IndexError::InvalidPath(path.to_path_buf()));
        }
        let base = path.canonicalize()?;

        self.stop_watcher();
        *self.state.base_path.write() = Some(base.clone());
        let report = self.state.rebuild()?;
        info!(project = %base.display(), files = report.file_count, "project indexed");
        self.start_watcher(base)?;
        Ok(report)
    }

    /// Best-effort warm start: load the persisted snapshot for `path` and
    /// begin watching without a rebuild. A missing or corrupt snapshot is
    /// not fatal; the index is left empty and `false` is returned.
    pub fn try_restore(&self, path: &Path) -> Result<bool> {
        if !path.is_dir() {
            return Err(IndexError::InvalidPath(path.to_path_buf()));
        }
        let base = path.canonicalize()?;

        self.stop_watcher();
        *self.state.base_path.write() = Some(base.clone());
        let loaded = self.state.load_snapshot(&base);
        if !loaded {
            *self.state.index.write() = CodeIndex::default();
        }
        self.start_watcher(base)?;
        Ok(loaded)
    }

    /// Rebuild the index without touching the watcher.
    pub fn refresh_index(&self) -> Result<BuildReport> {
        self.state.rebuild()
    }

    /// Match indexed files against a glob, by full relative path or by
    /// basename. Infallible: an empty index or an unparsable pattern
    /// yields an empty, sorted result.
    pub fn find_files(&self, pattern: &str) -> Vec<String> {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                warn!("invalid file glob '{pattern}': {e}");
                return Vec::new();
            }
        };
        let index = self.state.index.read();
        index
            .file_list
            .iter()
            .filter(|rel| {
                matcher.is_match(rel.as_str())
                    || Path::new(rel.as_str())
                        .file_name()
                        .map(|name| matcher.is_match(name))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn analyse_file(&self, path: &str) -> Result<FileAnalysis> {
        let rel = self.to_relative(path)?;
        let index = self.state.index.read();
        let record = index
            .files
            .get(&rel)
            .cloned()
            .ok_or_else(|| IndexError::NotIndexed(rel.clone()))?;
        let symbols: BTreeMap<SymbolId, Symbol> = index
            .symbols
            .iter()
            .filter(|(_, symbol)| symbol.file == rel)
            .map(|(id, symbol)| (id.clone(), symbol.clone()))
            .collect();
        Ok(FileAnalysis { file: rel, record, symbols })
    }

    /// Rebuild the directory tree from the flat file list.
    pub fn get_project_structure(&self) -> ProjectStructure {
        let index = self.state.index.read();
        let mut tree = Map::new();
        for rel in &index.file_list {
            let segments: Vec<&str> = rel
                .split(|c| c == '/' || c == '\\')
                .filter(|s| !s.is_empty())
                .collect();
            let Some((leaf, dirs)) = segments.split_last() else {
                continue;
            };
            if let Some(node) = descend(&mut tree, dirs) {
                node.insert((*leaf).to_owned(), Value::String("file".into()));
            }
        }
        ProjectStructure {
            tree: Value::Object(tree),
            total_files: index.file_list.len(),
        }
    }

    pub fn get_statistics(&self) -> Statistics {
        let index = self.state.index.read();
        let mut languages: BTreeMap<String, LanguageStats> = BTreeMap::new();
        let mut total_lines: u64 = 0;
        for record in index.files.values() {
            let entry = languages.entry(record.language.as_str().to_owned()).or_default();
            entry.files += 1;
            entry.lines += u64::from(record.line_count);
            total_lines += u64::from(record.line_count);
        }
        let mut symbols: BTreeMap<String, usize> = BTreeMap::new();
        for symbol in index.symbols.values() {
            *symbols.entry(symbol.kind.as_str().to_owned()).or_default() += 1;
        }
        Statistics {
            total_files: index.files.len(),
            total_lines,
            languages,
            symbols,
            available_tools: self.state.search.available().to_vec(),
            preferred_tool: self.state.search.preferred(),
        }
    }

    /// Full-text search over the project tree via the external engine.
    pub fn search_code(&self, pattern: &str, options: &SearchOptions) -> Result<SearchReport> {
        let base = self.state.base_path.read().clone().ok_or(IndexError::NoProjectSet)?;
        let results = self.state.search.search(pattern, &base, options)?;
        Ok(SearchReport {
            total_matches: results.len(),
            results,
            tool_used: self.state.search.preferred(),
        })
    }

    /// Line-by-line scan of a single file, case-insensitive substring or
    /// regex mode.
    pub fn search_in_file(&self, path: &str, pattern: &str, regex: bool) -> Result<FileSearchReport> {
        let base = self.state.base_path.read().clone().ok_or(IndexError::NoProjectSet)?;
        let candidate = Path::new(path);
        let full = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        };
        let content = fs::read_to_string(&full)?;

        let mut matches = Vec::new();
        if regex {
            let re = Regex::new(pattern)
                .map_err(|e| IndexError::SearchFailed(format!("invalid regex: {e}")))?;
            for (i, line) in content.lines().enumerate() {
                if let Some(found) = re.find(line) {
                    matches.push(FileMatch {
                        line_number: i as u32 + 1,
                        line_content: line.to_owned(),
                        match_start: found.start(),
                    });
                }
            }
        } else {
            let needle = pattern.to_lowercase();
            for (i, line) in content.lines().enumerate() {
                if let Some(start) = line.to_lowercase().find(&needle) {
                    matches.push(FileMatch {
                        line_number: i as u32 + 1,
                        line_content: line.to_owned(),
                        match_start: start,
                    });
                }
            }
        }
        Ok(FileSearchReport {
            file: path.to_owned(),
            pattern: pattern.to_owned(),
            total_matches: matches.len(),
            matches,
        })
    }

    pub fn get_file_imports(&self, path: &str) -> Result<FileImports> {
        let rel = self.to_relative(path)?;
        let index = self.state.index.read();
        let record = index
            .files
            .get(&rel)
            .ok_or_else(|| IndexError::NotIndexed(rel.clone()))?;
        Ok(FileImports {
            imports: record.imports.clone(),
            exports: record.exports.clone(),
            package: record.package.clone(),
            total_imports: record.imports.len(),
            file: rel,
        })
    }

    pub fn find_symbol_usage(&self, name: &str, kind: Option<SymbolKind>) -> Vec<SymbolMatch> {
        graph::find_symbol_usage(&self.state.index.read(), name, kind)
    }

    pub fn find_functions_calling(&self, name: &str) -> CallerReport {
        graph::find_functions_calling(&self.state.index.read(), name)
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().as_ref().map(|w| w.is_watching()).unwrap_or(false)
    }

    /// Stop the watcher and release resources. Idempotent; no watcher
    /// callback fires after this returns.
    pub fn shutdown(&self) {
        self.stop_watcher();
    }

    fn to_relative(&self, path: &str) -> Result<String> {
        let base = self.state.base_path.read().clone().ok_or(IndexError::NoProjectSet)?;
        let candidate = Path::new(path);
        let rel = candidate.strip_prefix(&base).unwrap_or(candidate);
        Ok(rel.to_string_lossy().into_owned())
    }

    fn start_watcher(&self, root: PathBuf) -> Result<()> {
        if !self.watch_enabled {
            return Ok(());
        }
        let state = Arc::clone(&self.state);
        let mut watcher = FileWatcher::new(
            root,
            Arc::new(move |path: &Path, event: FileEvent| state.apply_event(path, event)),
        )?;
        watcher.start()?;
        *self.watcher.lock() = Some(watcher);
        Ok(())
    }

    fn stop_watcher(&self) {
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.stop();
        }
    }
}

impl Drop for CodeIndexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl IndexerState {
    /// Clear and repopulate the index under the write lock, then persist.
    fn rebuild(&self) -> Result<BuildReport> {
        let base = self.base_path.read().clone().ok_or(IndexError::NoProjectSet)?;
        let started = Instant::now();
        let file_count;
        {
            let mut index = self.index.write();
            *index = CodeIndex::default();
            for entry in WalkDir::new(&base).into_iter().filter_entry(keep_entry) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("walk error: {e}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !has_watched_extension(entry.path()) {
                    continue;
                }
                let rel = relative_to(entry.path(), &base);
                index_one(&self.parsers, &mut index, entry.path(), &rel);
            }
            file_count = index.file_list.len();
        }
        self.save_snapshot();
        Ok(BuildReport {
            file_count,
            build_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Watcher callback: splice a single file's re-parse into the index,
    /// or drop the file on deletion. Parsing happens outside the lock.
    pub(crate) fn apply_event(&self, path: &Path, event: FileEvent) {
        let Some(base) = self.base_path.read().clone() else {
            return;
        };
        let rel = relative_to(path, &base);
        match event {
            FileEvent::Deleted => {
                debug!(file = %rel, "removing deleted file from index");
                self.index.write().remove_file(&rel);
            }
            FileEvent::Created | FileEvent::Modified => {
                if path.is_file() {
                    let content = match fs::read_to_string(path) {
                        Ok(content) => content,
                        Err(e) => {
                            warn!(file = %rel, "skipping unreadable file: {e}");
                            return;
                        }
                    };
                    match self.parsers.parse(&rel, &content) {
                        Ok(outcome) => self.index.write().insert_file(&rel, outcome),
                        Err(e) => {
                            warn!(file = %rel, "skipping unparsable file: {e}");
                            return;
                        }
                    }
                } else {
                    // The path vanished between the event and now.
                    self.index.write().remove_file(&rel);
                }
            }
        }
        self.save_snapshot();
    }

    fn snapshot_path(&self, base: &Path) -> PathBuf {
        let digest = blake3::hash(base.to_string_lossy().as_bytes());
        self.cache_dir.join(format!("{}.json", digest.to_hex()))
    }

    fn save_snapshot(&self) {
        let Some(base) = self.base_path.read().clone() else {
            return;
        };
        let path = self.snapshot_path(&base);
        let index = self.index.read();
        match serde_json::to_vec(&*index) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&path, bytes) {
                    warn!(cache = %path.display(), "failed to persist index snapshot: {e}");
                }
            }
            Err(e) => warn!("failed to serialize index snapshot: {e}"),
        }
    }

    fn load_snapshot(&self, base: &Path) -> bool {
        let path = self.snapshot_path(base);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        match serde_json::from_slice::<CodeIndex>(&bytes) {
            Ok(snapshot) => {
                *self.index.write() = snapshot;
                true
            }
            Err(e) => {
                warn!(cache = %path.display(), "ignoring corrupt index snapshot: {e}");
                false
            }
        }
    }
}

fn index_one(parsers: &ParserRegistry, index: &mut CodeIndex, abs: &Path, rel: &str) {
    let content = match fs::read_to_string(abs) {
        Ok(content) => content,
        Err(e) => {
            warn!(file = rel, "skipping unreadable file: {e}");
            return;
        }
    };
    match parsers.parse(rel, &content) {
        Ok(outcome) => index.insert_file(rel, outcome),
        Err(e) => warn!(file = rel, "skipping unparsable file: {e}"),
    }
}

fn keep_entry(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if entry.file_type().is_dir() {
        let name = entry.file_name().to_string_lossy();
        return !name.starts_with('.') && !IGNORED_DIRS.contains(&name.as_ref());
    }
    true
}

fn has_watched_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WATCHED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().into_owned()
}

fn descend<'a>(mut node: &'a mut Map<String, Value>, dirs: &[&str]) -> Option<&'a mut Map<String, Value>> {
    for dir in dirs {
        node = node
            .entry((*dir).to_owned())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
    }
    Some(node)
}

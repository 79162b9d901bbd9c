//! Lexical defect detection over a working tree.
//!
//! Four independent rules run per file; none of them parses the language.
//! Rules may fire on the same line, and the returned list carries no ordering
//! guarantee within a file. Files are visited in file-name order so the
//! concatenated result is deterministic for identical bytes.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::{BugType, Failure, Result};
use crate::suggest::SuggestionService;

pub const UNUSED_OS_MESSAGE: &str = "Unused import: os";
pub const MISSING_COLON_MESSAGE: &str = "Missing colon at end of line";
pub const MIXED_INDENT_MESSAGE: &str = "Mixed tabs and spaces";
pub const INDENT_AFTER_COLON_MESSAGE: &str = "Incorrect indent after colon";

/// Statement terminator expected after control keywords.
pub const TERMINATOR: char = ':';

/// Width of a tab when measuring indentation.
pub const TAB_WIDTH: usize = 4;

const VCS_METADATA_DIR: &str = ".git";

static OS_IMPORT_RE: OnceLock<Regex> = OnceLock::new();
static CONTROL_KEYWORD_RE: OnceLock<Regex> = OnceLock::new();
static SINGLE_IMPORT_RE: OnceLock<Regex> = OnceLock::new();

fn os_import_re() -> &'static Regex {
    OS_IMPORT_RE.get_or_init(|| Regex::new(r"^\s*import\s+os\s*(?:,|$)").expect("valid regex"))
}

fn control_keyword_re() -> &'static Regex {
    CONTROL_KEYWORD_RE.get_or_init(|| {
        Regex::new(r"^(?:if|for|def|elif|else|while|with|class)\b").expect("valid regex")
    })
}

fn single_import_re() -> &'static Regex {
    SINGLE_IMPORT_RE.get_or_init(|| {
        Regex::new(r"^\s*import\s+([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("valid regex")
    })
}

/// One scanned file: path relative to the tree root plus its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Scans a working tree, optionally augmented by a suggestion collaborator.
pub struct Detector {
    extensions: Vec<String>,
    suggestions: Option<Arc<dyn SuggestionService>>,
}

impl Detector {
    /// Scan files with the given extensions (without the dot). An empty list
    /// scans every file.
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions,
            suggestions: None,
        }
    }

    pub fn with_suggestions(mut self, service: Option<Arc<dyn SuggestionService>>) -> Self {
        self.suggestions = service;
        self
    }

    /// Detect failures across the tree rooted at `root`.
    ///
    /// Suggested failures are collected one file at a time after every
    /// lexical rule has run, and any suggestion whose `(file, line)` is
    /// already reported is dropped.
    pub async fn detect(&self, root: &Path) -> Result<Vec<Failure>> {
        let sources = collect_sources(root, &self.extensions)?;
        let mut failures: Vec<Failure> = sources
            .iter()
            .flat_map(|source| detect_source(&source.path, &source.content))
            .collect();
        let lexical = failures.len();

        if let Some(service) = &self.suggestions {
            let mut seen: HashSet<(String, usize)> = failures
                .iter()
                .map(|f| (f.file.clone(), f.line))
                .collect();
            for source in &sources {
                for suggested in service
                    .suggest_failures(&source.path, &source.content)
                    .await
                {
                    if suggested.line == 0 {
                        continue;
                    }
                    let failure = Failure {
                        file: source.path.clone(),
                        ..suggested
                    };
                    if seen.insert((failure.file.clone(), failure.line)) {
                        failures.push(failure);
                    }
                }
            }
        }

        debug!(
            files = sources.len(),
            lexical = lexical,
            suggested = failures.len() - lexical,
            "detection finished"
        );
        Ok(failures)
    }
}

/// Enumerate scannable files under `root`, skipping `.git` and non-UTF-8 files.
pub fn collect_sources(root: &Path, extensions: &[String]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != VCS_METADATA_DIR)
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !extensions.is_empty() {
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }

        let bytes = std::fs::read(path)?;
        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %path.display(), "skipping non-UTF-8 file");
                continue;
            }
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        sources.push(SourceFile {
            path: relative,
            content,
        });
    }

    Ok(sources)
}

/// Run every lexical rule over one file's content.
pub fn detect_source(file: &str, content: &str) -> Vec<Failure> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut failures = Vec::new();
    failures.extend(detect_unused_os(file, &lines));
    failures.extend(detect_missing_terminator(file, &lines));
    failures.extend(detect_unused_single_import(file, &lines));
    failures.extend(detect_indentation(file, &lines));
    failures
}

fn detect_unused_os(file: &str, lines: &[&str]) -> Vec<Failure> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| os_import_re().is_match(line) && !used_elsewhere(lines, "os", *i))
        .map(|(i, _)| Failure::new(file, i + 1, BugType::Linting, UNUSED_OS_MESSAGE))
        .collect()
}

fn detect_missing_terminator(file: &str, lines: &[&str]) -> Vec<Failure> {
    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if control_keyword_re().is_match(trimmed) && !trimmed.ends_with(TERMINATOR) {
            failures.push(Failure::new(
                file,
                i + 1,
                BugType::Syntax,
                MISSING_COLON_MESSAGE,
            ));
        }
    }
    failures
}

fn detect_unused_single_import(file: &str, lines: &[&str]) -> Vec<Failure> {
    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some(name) = single_import_name(line) else {
            continue;
        };
        // `os` belongs to the linting rule.
        if name == "os" {
            continue;
        }
        if !used_elsewhere(lines, name, i) {
            failures.push(Failure::new(
                file,
                i + 1,
                BugType::Import,
                format!("Unused import: {}", name),
            ));
        }
    }
    failures
}

fn detect_indentation(file: &str, lines: &[&str]) -> Vec<Failure> {
    let mut failures = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let leading = leading_whitespace(line);
        if leading.contains('\t') && leading.contains(' ') {
            failures.push(Failure::new(
                file,
                i + 1,
                BugType::Indentation,
                MIXED_INDENT_MESSAGE,
            ));
        }

        let trimmed = line.trim();
        if !trimmed.ends_with(TERMINATOR) || trimmed.starts_with('#') {
            continue;
        }
        let current = indent_width(line);
        let next = lines
            .iter()
            .enumerate()
            .skip(i + 1)
            .find(|(_, l)| !l.trim().is_empty());
        if let Some((j, next_line)) = next {
            if indent_width(next_line) <= current {
                failures.push(Failure::new(
                    file,
                    j + 1,
                    BugType::Indentation,
                    INDENT_AFTER_COLON_MESSAGE,
                ));
            }
        }
    }
    failures
}

/// The imported name when `line` is `import <identifier>` and nothing else.
pub fn single_import_name(line: &str) -> Option<&str> {
    single_import_re()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn used_elsewhere(lines: &[&str], word: &str, exclude: usize) -> bool {
    lines
        .iter()
        .enumerate()
        .any(|(i, line)| i != exclude && contains_word(line, word))
}

/// Whole-word containment with `\b` semantics: word characters are
/// alphanumerics and `_`.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Leading run of spaces and tabs.
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Indentation width in columns, counting a tab as [`TAB_WIDTH`] spaces.
pub fn indent_width(line: &str) -> usize {
    leading_whitespace(line)
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

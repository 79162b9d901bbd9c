//! Deterministic fix engine.
//!
//! Every failure refers to a line number in the file as it was detected, so
//! edits must never shift the lines other failures point at. Each referenced
//! file is loaded once into a sequence of optional line slots; a deletion
//! tombstones its slot and a rewrite replaces its text. Slots are compacted
//! only when the file is flushed, after every failure has been processed.
//!
//! Processing order: syntax, then linting (descending line per file), then
//! imports (descending line per file), then indentation. Deletions would be
//! safe in any order under the tombstone model; descending order keeps a
//! splice-based editor compatible without changing behaviour.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::detector::{
    indent_width, leading_whitespace, INDENT_AFTER_COLON_MESSAGE, MIXED_INDENT_MESSAGE,
    TAB_WIDTH, TERMINATOR,
};
use crate::domain::{BugType, Failure, Fix, Result};
use crate::suggest::{FixContext, SuggestionService};

pub const SYNTAX_FIX_DESCRIPTION: &str = "Added missing colon at end of line";
pub const LINTING_FIX_DESCRIPTION: &str = "Removed unused import line";
pub const MIXED_INDENT_FIX_DESCRIPTION: &str = "Replaced mixed tabs and spaces with spaces";
pub const INDENT_AFTER_COLON_FIX_DESCRIPTION: &str = "Indented block after colon";

const UNUSED_IMPORT_PREFIX: &str = "Unused import: ";

/// Which indentation repair a failure asks for, keyed by its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentRepair {
    MixedWhitespace,
    BlockAfterColon,
}

impl IndentRepair {
    fn from_message(message: &str) -> Option<Self> {
        match message.trim() {
            MIXED_INDENT_MESSAGE => Some(IndentRepair::MixedWhitespace),
            INDENT_AFTER_COLON_MESSAGE => Some(IndentRepair::BlockAfterColon),
            _ => None,
        }
    }
}

/// Line slots of one file. `None` marks a deleted line.
#[derive(Debug)]
struct LineBuffer {
    slots: Vec<Option<String>>,
    dirty: bool,
}

impl LineBuffer {
    fn parse(content: &str) -> Self {
        Self {
            slots: content.split('\n').map(|l| Some(l.to_string())).collect(),
            dirty: false,
        }
    }

    /// Live text at a 1-based line, if the slot exists and was not deleted.
    fn live(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .and_then(|slot| slot.as_deref())
    }

    fn replace(&mut self, line: usize, text: String) {
        if let Some(slot) = self.slots.get_mut(line - 1) {
            *slot = Some(text);
            self.dirty = true;
        }
    }

    fn delete(&mut self, line: usize) -> bool {
        match line.checked_sub(1).and_then(|idx| self.slots.get_mut(idx)) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Nearest live slot before `line`, i.e. the line that will physically
    /// precede it once the buffer is compacted.
    fn previous_live(&self, line: usize) -> Option<&str> {
        self.slots[..line.saturating_sub(1).min(self.slots.len())]
            .iter()
            .rev()
            .find_map(|slot| slot.as_deref())
    }

    fn render(&self) -> String {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Files touched by one pass, loaded lazily and flushed together.
struct WorkingSet<'a> {
    root: &'a Path,
    files: BTreeMap<String, LineBuffer>,
    missing: HashSet<String>,
}

impl<'a> WorkingSet<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            files: BTreeMap::new(),
            missing: HashSet::new(),
        }
    }

    /// Buffer for `file`, or `None` when the file does not exist in the tree.
    fn buffer(&mut self, file: &str) -> Result<Option<&mut LineBuffer>> {
        if self.missing.contains(file) {
            return Ok(None);
        }
        if !self.files.contains_key(file) {
            if !is_tree_relative(file) {
                warn!(file = %file, "ignoring failure outside the working tree");
                self.missing.insert(file.to_string());
                return Ok(None);
            }
            let path = self.root.join(file);
            if !path.is_file() {
                debug!(file = %file, "skipping failure for missing file");
                self.missing.insert(file.to_string());
                return Ok(None);
            }
            let content = std::fs::read_to_string(&path)?;
            self.files
                .insert(file.to_string(), LineBuffer::parse(&content));
        }
        Ok(self.files.get_mut(file))
    }

    fn flush(self) -> Result<usize> {
        let mut written = 0;
        for (file, buffer) in &self.files {
            if buffer.dirty {
                std::fs::write(self.root.join(file), buffer.render())?;
                written += 1;
            }
        }
        Ok(written)
    }
}

fn is_tree_relative(file: &str) -> bool {
    Path::new(file)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A recorded fix plus the line text it replaced.
#[derive(Debug, Clone)]
struct AppliedEdit {
    fix: Fix,
    snippet: String,
}

/// Applies fixes to a working tree, optionally enriching descriptions.
#[derive(Default)]
pub struct FixEngine {
    suggestions: Option<Arc<dyn SuggestionService>>,
}

impl FixEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suggestions(mut self, service: Option<Arc<dyn SuggestionService>>) -> Self {
        self.suggestions = service;
        self
    }

    /// Apply fixes for `failures` in place under `root` and return the fixes
    /// actually made.
    pub async fn apply(&self, root: &Path, failures: &[Failure]) -> Result<Vec<Fix>> {
        let mut edits = apply_edits(root, failures)?;

        if let Some(service) = &self.suggestions {
            for edit in &mut edits {
                let context = FixContext {
                    file: edit.fix.file.clone(),
                    line: edit.fix.line,
                    bug_type: edit.fix.bug_type,
                    snippet: edit.snippet.clone(),
                };
                if let Some(description) = service.fix_description(&context).await {
                    let description = description.trim();
                    if !description.is_empty() {
                        edit.fix.fix_description = description.to_string();
                    }
                }
            }
        }

        Ok(edits.into_iter().map(|e| e.fix).collect())
    }
}

/// Apply fixes without description enrichment.
pub fn apply_fixes(root: &Path, failures: &[Failure]) -> Result<Vec<Fix>> {
    Ok(apply_edits(root, failures)?
        .into_iter()
        .map(|e| e.fix)
        .collect())
}

fn apply_edits(root: &Path, failures: &[Failure]) -> Result<Vec<AppliedEdit>> {
    let mut syntax = Vec::new();
    let mut linting = Vec::new();
    let mut imports = Vec::new();
    let mut indentation = Vec::new();

    for failure in failures {
        match failure.bug_type {
            BugType::Syntax => syntax.push(failure),
            BugType::Linting => linting.push(failure),
            BugType::Import => imports.push(failure),
            BugType::Indentation => indentation.push(failure),
            BugType::Logic | BugType::TypeError => {
                debug!(
                    file = %failure.file,
                    line = failure.line,
                    bug_type = %failure.bug_type,
                    "no deterministic repair"
                );
            }
        }
    }

    let mut set = WorkingSet::new(root);
    let mut edits = Vec::new();

    for failure in syntax {
        let Some(buffer) = set.buffer(&failure.file)? else {
            continue;
        };
        let Some(text) = buffer.live(failure.line) else {
            continue;
        };
        if text.is_empty() || text.trim().ends_with(TERMINATOR) {
            continue;
        }
        let snippet = text.to_string();
        let fixed = format!("{}{}", text.trim_end(), TERMINATOR);
        buffer.replace(failure.line, fixed);
        edits.push(AppliedEdit {
            fix: Fix::applied(failure, SYNTAX_FIX_DESCRIPTION),
            snippet,
        });
    }

    for failure in descending_by_file(linting) {
        if let Some(edit) = delete_line(&mut set, failure, LINTING_FIX_DESCRIPTION.to_string())? {
            edits.push(edit);
        }
    }

    for failure in descending_by_file(imports) {
        let description = failure
            .message
            .strip_prefix(UNUSED_IMPORT_PREFIX)
            .map(|name| format!("Removed unused import: {}", name.trim()))
            .unwrap_or_else(|| LINTING_FIX_DESCRIPTION.to_string());
        if let Some(edit) = delete_line(&mut set, failure, description)? {
            edits.push(edit);
        }
    }

    for failure in indentation {
        let Some(repair) = IndentRepair::from_message(&failure.message) else {
            debug!(
                file = %failure.file,
                line = failure.line,
                message = %failure.message,
                "unrecognised indentation failure"
            );
            continue;
        };
        let Some(buffer) = set.buffer(&failure.file)? else {
            continue;
        };
        let Some(text) = buffer.live(failure.line) else {
            continue;
        };
        let snippet = text.to_string();
        let body = &text[leading_whitespace(text).len()..];
        let (width, description) = match repair {
            IndentRepair::MixedWhitespace => (indent_width(text), MIXED_INDENT_FIX_DESCRIPTION),
            IndentRepair::BlockAfterColon => (
                buffer.previous_live(failure.line).map(indent_width).unwrap_or(0) + TAB_WIDTH,
                INDENT_AFTER_COLON_FIX_DESCRIPTION,
            ),
        };
        let fixed = format!("{}{}", " ".repeat(width), body);
        if fixed == text {
            debug!(
                file = %failure.file,
                line = failure.line,
                "indentation already matches, nothing to repair"
            );
            continue;
        }
        buffer.replace(failure.line, fixed);
        edits.push(AppliedEdit {
            fix: Fix::applied(failure, description),
            snippet,
        });
    }

    let written = set.flush()?;
    debug!(fixes = edits.len(), files = written, "fix pass flushed");
    Ok(edits)
}

/// Per file, highest line first. Files keep their first-seen order.
fn descending_by_file(mut failures: Vec<&Failure>) -> Vec<&Failure> {
    let mut order: Vec<&str> = Vec::new();
    for f in failures.iter().copied() {
        if !order.contains(&f.file.as_str()) {
            order.push(f.file.as_str());
        }
    }
    let rank = |file: &str| order.iter().position(|o| *o == file).unwrap_or(usize::MAX);
    failures.sort_by(|a, b| {
        rank(&a.file)
            .cmp(&rank(&b.file))
            .then_with(|| b.line.cmp(&a.line))
    });
    failures
}

fn delete_line(
    set: &mut WorkingSet<'_>,
    failure: &Failure,
    description: String,
) -> Result<Option<AppliedEdit>> {
    let Some(buffer) = set.buffer(&failure.file)? else {
        return Ok(None);
    };
    let snippet = match buffer.live(failure.line) {
        Some(text) => text.to_string(),
        None => return Ok(None),
    };
    if !buffer.delete(failure.line) {
        return Ok(None);
    }
    Ok(Some(AppliedEdit {
        fix: Fix::applied(failure, description),
        snippet,
    }))
}

//! Patch Synthesizer
//!
//! Renders branches for resources flagged for update and splices them into
//! the dispatch table right before the catch-all. Text outside the inserted
//! span is never touched, and the file is replaced atomically.

use super::extract::{catch_all_re, read_source};
use super::scanner::{self, RoutineSpan};
use super::Dialect;
use crate::docs::Complexity;
use crate::error::PatchError;
use crate::reconcile::Reconciliation;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SWITCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bswitch\s*\(").unwrap());

static LABEL_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bcase\s+['"][^'"\n]+['"]\s*:\s*$"#).unwrap());

/// One extra indentation level for branch bodies
const INDENT: &str = "    ";

/// Source with generated branches spliced in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub text: String,
    /// Byte range of the inserted text within `text`
    pub inserted: Range<usize>,
    /// Number of resources that received a branch
    pub resources: usize,
}

/// Result of a successful patch
#[derive(Debug, Clone)]
pub struct PatchSummary {
    pub path: PathBuf,
    pub resources: usize,
}

/// Updates grouped by expected complexity, first occurrence of each resource kept
struct UpdateGroups<'a> {
    complex: Vec<&'a Reconciliation>,
    named: Vec<&'a Reconciliation>,
    simple: Vec<&'a Reconciliation>,
}

impl<'a> UpdateGroups<'a> {
    fn new(results: &'a [Reconciliation]) -> Self {
        let mut seen = BTreeSet::new();
        let mut groups = Self {
            complex: Vec::new(),
            named: Vec::new(),
            simple: Vec::new(),
        };

        for result in results.iter().filter(|r| r.needs_update) {
            if !seen.insert(result.resource.as_str()) {
                continue;
            }
            match result.expected {
                Complexity::Complex => groups.complex.push(result),
                Complexity::SimpleName => groups.named.push(result),
                Complexity::Simple => groups.simple.push(result),
            }
        }

        groups
    }

    fn len(&self) -> usize {
        self.complex.len() + self.named.len() + self.simple.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Render the branches for every result flagged `needs_update`.
///
/// Complex and name-based resources get one branch each with their suggested
/// code; simple resources share a single stacked branch returning the
/// physical identifier. Each line is prefixed with `indent`.
pub fn render_branches(results: &[Reconciliation], dialect: &Dialect, indent: &str) -> String {
    render_groups(&UpdateGroups::new(results), dialect, indent)
}

fn render_groups(groups: &UpdateGroups<'_>, dialect: &Dialect, indent: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    let sections = [
        ("// Complex import patterns", &groups.complex),
        ("// Name-based import patterns", &groups.named),
    ];
    for (heading, group) in sections {
        if group.is_empty() {
            continue;
        }
        lines.push(format!("{indent}{heading}"));
        for result in group.iter() {
            lines.push(format!("{indent}case '{}':", result.resource));
            lines.push(format!("{}{}{}", indent, INDENT, result.suggested_code));
            lines.push(String::new());
        }
    }

    if !groups.simple.is_empty() {
        lines.push(format!("{indent}// Simple ID import patterns"));
        for result in &groups.simple {
            lines.push(format!("{indent}case '{}':", result.resource));
        }
        lines.push(format!("{}{}{}", indent, INDENT, dialect.bare_return()));
        lines.push(String::new());
    }

    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Where new branches go: the start of the catch-all's line, moved up past
/// any labels stacked onto it. Without a catch-all, the line closing the
/// switch (or the routine).
fn insertion_point(source: &str, routine: RoutineSpan, dialect: &Dialect) -> (usize, String) {
    let body = routine.body();
    let masked = scanner::mask_comments(&source[body.clone()]);

    if let Some(found) = catch_all_re(dialect).find(&masked) {
        let mut at = found.start();
        // Labels with empty bodies directly above share the catch-all
        while let Some(label) = LABEL_END_RE.find(masked[..at].trim_end()) {
            at = label.start();
        }
        let pos = body.start + at;
        return place(source, pos, scanner::line_indent(source, pos).to_string());
    }

    let close = SWITCH_RE
        .find(&masked)
        .and_then(|m| scanner::next_open_brace(source, body.start + m.end()))
        .and_then(|open| scanner::matching_brace(source, open))
        .filter(|&close| close < routine.close)
        .unwrap_or(routine.close);

    let indent = format!("{}{}", scanner::line_indent(source, close), INDENT);
    place(source, close, indent)
}

/// Move `pos` to the start of its line when only whitespace precedes it
fn place(source: &str, pos: usize, indent: String) -> (usize, String) {
    let line_start = scanner::line_start(source, pos);
    if source[line_start..pos].trim().is_empty() {
        (line_start, indent)
    } else {
        (pos, indent)
    }
}

/// Splice generated branches into the dispatch table
pub fn splice(
    source: &str,
    results: &[Reconciliation],
    dialect: &Dialect,
) -> Result<Splice, PatchError> {
    let groups = UpdateGroups::new(results);
    if groups.is_empty() {
        return Err(PatchError::NothingToInsert);
    }

    let routine = scanner::routine_span(source, &dialect.routine_marker)?;
    let (pos, indent) = insertion_point(source, routine, dialect);

    let mut fragment = render_groups(&groups, dialect, &indent);
    // Insertion point shares its line with code: start the branches on a new line
    if pos > 0 && !source[..pos].ends_with('\n') {
        fragment.insert(0, '\n');
    }

    let mut text = String::with_capacity(source.len() + fragment.len());
    text.push_str(&source[..pos]);
    text.push_str(&fragment);
    text.push_str(&source[pos..]);

    Ok(Splice {
        text,
        inserted: pos..pos + fragment.len(),
        resources: groups.len(),
    })
}

/// Read the dispatch source, splice in the updates and write it back.
/// On any failure the file keeps its previous contents.
pub fn apply(
    path: &Path,
    results: &[Reconciliation],
    dialect: &Dialect,
) -> Result<PatchSummary, PatchError> {
    let source = read_source(path)?;
    let spliced = splice(&source, results, dialect)?;
    commit(path, &spliced)
}

/// Replace `path` with the spliced text
fn commit(path: &Path, spliced: &Splice) -> Result<PatchSummary, PatchError> {
    write_atomic(path, &spliced.text).map_err(|source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        "Inserted {} branches into {:?} at bytes {:?}",
        spliced.resources,
        path,
        spliced.inserted
    );
    Ok(PatchSummary {
        path: path.to_path_buf(),
        resources: spliced.resources,
    })
}

/// Write through a temporary file in the same directory, then rename over `path`
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

//! Source Extractor
//!
//! Classifies every branch of the dispatch table into an [`ImplStatus`].
//! Three passes run in priority order, each only filling gaps left by the
//! previous one:
//!
//! 1. branches whose own body ends in a `return`
//! 2. branches inside the block documented as falling back to the physical id
//! 3. everything else, following stacked labels to their shared body
//!
//! Catalog types without a branch are then covered by the catch-all, if it
//! returns the physical identifier.

use super::scanner::{self, RoutineSpan};
use super::{Dialect, ImplStatus, ImplementationMap};
use crate::catalog::Catalog;
use crate::error::SourceError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Branch label with either quoting style
static CASE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bcase\s+['"]([^'"\n]+)['"]\s*:"#).unwrap());

static RETURN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\breturn\b").unwrap());

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bbreak\s*;").unwrap());

/// Read the dispatch source and classify it
pub fn extract_file(
    path: &Path,
    catalog: &Catalog,
    dialect: &Dialect,
) -> Result<ImplementationMap, SourceError> {
    let source = read_source(path)?;
    extract(&source, catalog, dialect)
}

/// Read the dispatch source file
pub fn read_source(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SourceError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Classify every resource type handled by the generation routine in `source`
pub fn extract(
    source: &str,
    catalog: &Catalog,
    dialect: &Dialect,
) -> Result<ImplementationMap, SourceError> {
    let routine = scanner::routine_span(source, &dialect.routine_marker)?;
    let table = DispatchTable::parse(source, routine, dialect);
    let implemented = table.classify(catalog);

    tracing::info!(
        "Extracted {} implemented resource types ({} branch labels)",
        implemented.len(),
        table.labels.len()
    );
    Ok(implemented)
}

/// A `case '<name>':` label, with byte offsets into the routine body
#[derive(Debug, Clone)]
struct Label {
    name: String,
    start: usize,
    end: usize,
}

/// What ends a branch body
#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminator {
    Return(String),
    Break,
    /// Next branch label, at the given label index
    NextLabel(usize),
    CatchAll,
    End,
}

/// The routine body, comment-masked, with every boundary located up front
struct DispatchTable<'a> {
    /// Routine body as written, for comment markers
    raw: &'a str,
    /// Routine body with comments blanked
    masked: String,
    labels: Vec<Label>,
    catch_all: Option<(usize, usize)>,
    returns: Vec<(usize, usize)>,
    breaks: Vec<usize>,
    dialect: &'a Dialect,
}

impl<'a> DispatchTable<'a> {
    fn parse(source: &'a str, routine: RoutineSpan, dialect: &'a Dialect) -> Self {
        let raw = &source[routine.body()];
        let masked = scanner::mask_comments(raw);

        let labels = CASE_LABEL_RE
            .captures_iter(&masked)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Label {
                    name: caps[1].to_string(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect();

        let catch_all = catch_all_re(dialect)
            .find(&masked)
            .map(|m| (m.start(), m.end()));

        let returns = RETURN_RE
            .find_iter(&masked)
            .map(|m| (m.start(), m.end()))
            .collect();

        let breaks = BREAK_RE.find_iter(&masked).map(|m| m.start()).collect();

        Self {
            raw,
            masked,
            labels,
            catch_all,
            returns,
            breaks,
            dialect,
        }
    }

    fn classify(&self, catalog: &Catalog) -> ImplementationMap {
        let mut implemented = ImplementationMap::new();

        for name in self.duplicate_labels() {
            tracing::warn!(
                "Resource type {} has more than one branch; only the first one runs",
                name
            );
        }

        // Pass 1: branches with their own return statement. A later branch
        // for the same name wins, since generated branches are appended.
        for label in &self.labels {
            if let (Terminator::Return(expr), _) = self.terminator_after(label.end) {
                implemented.insert(label.name.clone(), self.status_for_return(&expr));
            }
        }

        // Pass 2: the block of branches documented as using the physical id
        if let Some(block) = self.simple_block() {
            for label in self.labels.iter().filter(|l| block.contains(&l.start)) {
                implemented
                    .entry(label.name.clone())
                    .or_insert(ImplStatus::Simple);
            }
        }

        // Pass 3: whatever is left, following stacked labels
        for (index, label) in self.labels.iter().enumerate() {
            if !implemented.contains_key(&label.name) {
                let status = self.resolve_stacked(index);
                tracing::debug!("Branch {} resolved as {}", label.name, status);
                implemented.insert(label.name.clone(), status);
            }
        }

        if self.catch_all_returns_physical_id() {
            for name in catalog.iter() {
                if !implemented.contains_key(name) {
                    implemented.insert(name.to_string(), ImplStatus::DefaultCase);
                }
            }
        } else {
            tracing::warn!("No catch-all branch returning the physical id; unmatched types stay missing");
        }

        implemented
    }

    /// Names labelled more than once, in order of their second appearance
    fn duplicate_labels(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = Vec::new();
        for label in &self.labels {
            if !seen.insert(label.name.as_str()) && !duplicates.contains(&label.name.as_str()) {
                duplicates.push(label.name.as_str());
            }
        }
        duplicates
    }

    /// First boundary at or after `from`, and where it starts
    fn terminator_after(&self, from: usize) -> (Terminator, usize) {
        let mut best = (Terminator::End, self.masked.len());

        let next_label = self.labels.partition_point(|l| l.start < from);
        if let Some(label) = self.labels.get(next_label) {
            best = (Terminator::NextLabel(next_label), label.start);
        }

        if let Some((start, _)) = self.catch_all.filter(|&(start, _)| start >= from) {
            if start < best.1 {
                best = (Terminator::CatchAll, start);
            }
        }

        let next_break = self.breaks.partition_point(|&b| b < from);
        if let Some(&start) = self.breaks.get(next_break) {
            if start < best.1 {
                best = (Terminator::Break, start);
            }
        }

        let next_return = self.returns.partition_point(|&(s, _)| s < from);
        if let Some(&(start, end)) = self.returns.get(next_return) {
            if start < best.1 {
                best = (Terminator::Return(self.return_expr(end)), start);
            }
        }

        best
    }

    /// Expression after a `return` keyword ending at `end`. Without a
    /// semicolon it stops at the enclosing block's close or the next branch
    /// boundary.
    fn return_expr(&self, end: usize) -> String {
        let stop = scanner::statement_end(&self.masked, end).min(self.next_boundary(end));
        self.masked[end..stop].trim().to_string()
    }

    /// Start of the first label, catch-all, `break` or `return` at or after `from`
    fn next_boundary(&self, from: usize) -> usize {
        let label = self.labels[self.labels.partition_point(|l| l.start < from)..]
            .first()
            .map(|l| l.start);
        let catch_all = self
            .catch_all
            .map(|(start, _)| start)
            .filter(|&start| start >= from);
        let brk = self.breaks[self.breaks.partition_point(|&b| b < from)..]
            .first()
            .copied();
        let ret = self.returns[self.returns.partition_point(|&(s, _)| s < from)..]
            .first()
            .map(|&(s, _)| s);

        [label, catch_all, brk, ret]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(self.masked.len())
    }

    fn status_for_return(&self, expr: &str) -> ImplStatus {
        if expr == self.dialect.physical_id {
            ImplStatus::Simple
        } else {
            ImplStatus::Complex
        }
    }

    /// Follow a label through any directly stacked labels to the body they share
    fn resolve_stacked(&self, mut index: usize) -> ImplStatus {
        loop {
            let label = &self.labels[index];
            match self.terminator_after(label.end) {
                (Terminator::NextLabel(next), start)
                    if self.masked[label.end..start].trim().is_empty() =>
                {
                    index = next;
                }
                (Terminator::CatchAll, start) if self.masked[label.end..start].trim().is_empty() => {
                    return match self.catch_all.map(|(_, end)| self.terminator_after(end)) {
                        Some((Terminator::Return(expr), _)) => self.status_for_return(&expr),
                        _ => ImplStatus::Fallthrough,
                    };
                }
                (Terminator::Return(expr), _) => return self.status_for_return(&expr),
                _ => return ImplStatus::Fallthrough,
            }
        }
    }

    /// Span from the simple-block marker up to the catch-all (or body end)
    fn simple_block(&self) -> Option<std::ops::Range<usize>> {
        let start = self.raw.find(&self.dialect.simple_block_marker)?;
        let end = match self.catch_all {
            Some((catch_all, _)) if catch_all > start => catch_all,
            _ => self.raw.len(),
        };
        Some(start..end)
    }

    fn catch_all_returns_physical_id(&self) -> bool {
        let Some((_, end)) = self.catch_all else {
            return false;
        };
        matches!(
            self.terminator_after(end),
            (Terminator::Return(expr), _) if expr == self.dialect.physical_id
        )
    }
}

/// Matches the catch-all branch keyword followed by a colon
pub(crate) fn catch_all_re(dialect: &Dialect) -> Regex {
    let pattern = format!(r"\b{}\s*:", regex::escape(&dialect.catch_all));
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new(r"\bdefault\s*:").unwrap())
}

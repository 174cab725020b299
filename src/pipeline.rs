//! Orchestration
//!
//! Wires the stages together: catalog and extraction give a joined status
//! per resource type, each one goes through fetch -> classify -> reconcile,
//! and the collected findings feed the patch synthesizer.
//!
//! Fetches are strictly sequential with a fixed delay after each one.

use crate::catalog::Catalog;
use crate::config::MIN_FETCH_DELAY;
use crate::dispatch::patch::{self, PatchSummary};
use crate::dispatch::{extract, Dialect, ImplStatus, ImplementationMap};
use crate::docs::{classify_outcome, DocSource, ExpectedPattern, FetchOutcome, Provenance};
use crate::error::PatchError;
use crate::reconcile::{self, ReconcileStatus, Reconciliation};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

/// Catalog coverage of the dispatch table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub catalog_size: usize,
    /// Every resource type the dispatch table knows, catalog or not
    pub implemented: usize,
    /// Catalog resource types the dispatch table knows
    pub covered: usize,
    pub missing: Vec<String>,
    pub coverage_pct: f64,
}

impl CoverageSummary {
    pub fn compute(catalog: &Catalog, implemented: &ImplementationMap) -> Self {
        let missing: Vec<String> = catalog
            .iter()
            .filter(|name| !implemented.contains_key(*name))
            .map(str::to_string)
            .collect();
        let covered = catalog.len() - missing.len();
        let coverage_pct = if catalog.is_empty() {
            0.0
        } else {
            covered as f64 / catalog.len() as f64 * 100.0
        };

        Self {
            catalog_size: catalog.len(),
            implemented: implemented.len(),
            covered,
            missing,
            coverage_pct,
        }
    }
}

/// Which part of a validation run a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Implemented,
    Missing,
}

/// Progress notification for one resource about to be examined
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub stage: Stage,
    /// 1-based position within the stage
    pub index: usize,
    pub total: usize,
    pub resource: &'a str,
}

/// Expected pattern and reconciliation for one resource type
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub result: Reconciliation,
    pub pattern: ExpectedPattern,
    /// Transport error when the documentation fetch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

/// All findings of one validation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationRun {
    pub findings: Vec<Finding>,
}

impl ValidationRun {
    pub fn results(&self) -> impl Iterator<Item = &Reconciliation> {
        self.findings.iter().map(|f| &f.result)
    }

    /// Results flagged for update, in run order
    pub fn updates(&self) -> Vec<Reconciliation> {
        self.results().filter(|r| r.needs_update).cloned().collect()
    }

    pub fn status_counts(&self) -> BTreeMap<ReconcileStatus, usize> {
        let mut counts = BTreeMap::new();
        for result in self.results() {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        counts
    }

    /// How many patterns came from each kind of evidence
    pub fn provenance_counts(&self) -> BTreeMap<Provenance, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.pattern.provenance).or_insert(0) += 1;
        }
        counts
    }

    /// Findings whose documentation fetch failed
    pub fn fetch_failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.fetch_error.is_some())
    }
}

/// Runs documentation lookups against a [`DocSource`], one at a time
pub struct Validator<S> {
    source: S,
    dialect: Dialect,
    delay: Duration,
}

impl<S: DocSource> Validator<S> {
    /// `delay` is raised to [`MIN_FETCH_DELAY`] if shorter
    pub fn new(source: S, dialect: Dialect, delay: Duration) -> Self {
        Self {
            source,
            dialect,
            delay: delay.max(MIN_FETCH_DELAY),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Fetch, classify and reconcile one resource type, then wait out the delay
    pub async fn examine(&self, resource: &str, current: Option<ImplStatus>) -> Finding {
        let outcome = self.source.fetch(resource).await;
        let pattern = classify_outcome(resource, &outcome, &self.dialect);
        let fetch_error = match outcome {
            FetchOutcome::Failed(message) => Some(message),
            FetchOutcome::Found(_) | FetchOutcome::NotFound => None,
        };
        let result = reconcile::reconcile(resource, current, &pattern);

        tracing::debug!(
            "{}: current={} expected={} status={} ({:?})",
            resource,
            result.current_label(),
            result.expected,
            result.status,
            pattern.provenance
        );

        tokio::time::sleep(self.delay).await;
        Finding {
            result,
            pattern,
            fetch_error,
        }
    }

    /// Examine every catalog resource type: implemented ones first, then the
    /// missing ones in name order
    pub async fn validate<F>(
        &self,
        catalog: &Catalog,
        implemented: &ImplementationMap,
        mut on_progress: F,
    ) -> ValidationRun
    where
        F: FnMut(Progress<'_>),
    {
        let known: Vec<(&str, ImplStatus)> = implemented
            .iter()
            .filter(|(name, _)| catalog.contains(name))
            .map(|(name, status)| (name.as_str(), *status))
            .collect();
        let missing: Vec<&str> = catalog
            .iter()
            .filter(|name| !implemented.contains_key(*name))
            .collect();

        tracing::info!(
            "Validating {} implemented and {} missing resource types",
            known.len(),
            missing.len()
        );

        let mut run = ValidationRun::default();

        for (i, (resource, status)) in known.iter().enumerate() {
            on_progress(Progress {
                stage: Stage::Implemented,
                index: i + 1,
                total: known.len(),
                resource,
            });
            run.findings.push(self.examine(resource, Some(*status)).await);
        }

        for (i, resource) in missing.iter().enumerate() {
            on_progress(Progress {
                stage: Stage::Missing,
                index: i + 1,
                total: missing.len(),
                resource,
            });
            run.findings.push(self.examine(resource, None).await);
        }

        run
    }

    /// Examine an explicit selection of resource types
    pub async fn check(&self, resources: &[String], implemented: &ImplementationMap) -> Vec<Finding> {
        let mut findings = Vec::with_capacity(resources.len());
        for resource in resources {
            let current = implemented.get(resource).copied();
            findings.push(self.examine(resource, current).await);
        }
        findings
    }
}

/// Requested names that matched nothing, with close alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmatched {
    pub requested: String,
    pub suggestions: Vec<String>,
}

/// Resources chosen for a check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Sorted, deduplicated
    pub resources: Vec<String>,
    pub unmatched: Vec<Unmatched>,
}

const MAX_SUGGESTIONS: usize = 5;

/// Resolve names and glob patterns against the implemented resource types
pub fn select_resources(requested: &[String], implemented: &ImplementationMap) -> Selection {
    let mut resources = BTreeSet::new();
    let mut unmatched = Vec::new();

    for request in requested {
        if is_glob(request) {
            match glob::Pattern::new(request) {
                Ok(pattern) => resources.extend(
                    implemented
                        .keys()
                        .filter(|name| pattern.matches(name))
                        .cloned(),
                ),
                Err(e) => {
                    tracing::warn!("Invalid pattern {}: {}", request, e);
                    unmatched.push(Unmatched {
                        requested: request.clone(),
                        suggestions: Vec::new(),
                    });
                }
            }
        } else if implemented.contains_key(request) {
            resources.insert(request.clone());
        } else {
            let needle = request.to_lowercase();
            let suggestions = implemented
                .keys()
                .filter(|name| name.to_lowercase().contains(&needle))
                .take(MAX_SUGGESTIONS)
                .cloned()
                .collect();
            unmatched.push(Unmatched {
                requested: request.clone(),
                suggestions,
            });
        }
    }

    Selection {
        resources: resources.into_iter().collect(),
        unmatched,
    }
}

fn is_glob(request: &str) -> bool {
    request.contains(['*', '?', '['])
}

/// Result of applying a validation run's updates
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub patch: PatchSummary,
    pub coverage: CoverageSummary,
}

/// Apply every pending update to the dispatch table, then re-extract it
pub fn apply_updates(
    path: &Path,
    run: &ValidationRun,
    catalog: &Catalog,
    dialect: &Dialect,
) -> Result<UpdateOutcome, PatchError> {
    let patch = patch::apply(path, &run.updates(), dialect)?;
    let implemented = extract::extract_file(path, catalog, dialect)?;

    Ok(UpdateOutcome {
        patch,
        coverage: CoverageSummary::compute(catalog, &implemented),
    })
}

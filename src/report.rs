//! Console and JSON reporting

use crate::pipeline::{CoverageSummary, Finding, Progress, Selection, Stage, ValidationRun};
use crate::docs::Provenance;
use crate::reconcile::{ReconcileStatus, Reconciliation};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crossterm::style::{StyledContent, Stylize};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Number of pending updates listed before asking for confirmation
pub const PREVIEW_LIMIT: usize = 5;

pub fn status_marker(status: ReconcileStatus) -> StyledContent<&'static str> {
    match status {
        ReconcileStatus::Correct => "✔".green(),
        ReconcileStatus::ProbablyCorrect => "✱".cyan(),
        ReconcileStatus::Incorrect => "✘".red(),
        ReconcileStatus::Missing => "+".yellow(),
        ReconcileStatus::ReviewNeeded => "?".magenta(),
    }
}

pub fn print_banner() {
    println!("{}", "importsync: Terraform import ID validator".bold());
    println!("{}", "=".repeat(60));
}

pub fn print_summary(summary: &CoverageSummary) {
    println!("Total resources: {}", summary.catalog_size);
    println!("Implemented:     {}", summary.implemented);
    println!(
        "Coverage:        {:.1}% ({}/{})",
        summary.coverage_pct, summary.covered, summary.catalog_size
    );
    println!(
        "Missing:         {}",
        summary.missing.len().to_string().red()
    );
}

/// Overwrite the current line with a progress counter
pub fn print_progress(progress: Progress<'_>) {
    if progress.index == 1 && progress.stage == Stage::Missing {
        println!();
        println!("Analyzing {} missing resources...", progress.total);
    }
    let pct = progress.index as f64 / progress.total.max(1) as f64 * 100.0;
    print!(
        "\rProgress: {}/{} ({:.0}%) {:<60}",
        progress.index, progress.total, pct, progress.resource
    );
    let _ = std::io::stdout().flush();
}

pub fn print_status_counts(counts: &BTreeMap<ReconcileStatus, usize>) {
    println!();
    println!("{}", "VALIDATION RESULTS:".bold());
    for (status, count) in counts {
        println!("  {} {}: {}", status_marker(*status), status.title(), count);
    }
}

/// Count of patterns that fell back for lack of documentation, and every
/// failed fetch with its error
pub fn print_fetch_diagnostics(run: &ValidationRun) {
    let counts = run.provenance_counts();
    let no_page = counts.get(&Provenance::Default).copied().unwrap_or(0);
    let failed = counts.get(&Provenance::Error).copied().unwrap_or(0);
    if no_page == 0 && failed == 0 {
        return;
    }

    println!();
    println!(
        "Assumed simple without documentation: {} (no page), {} (fetch failed)",
        no_page, failed
    );
    for finding in run.fetch_failures() {
        if let Some(error) = &finding.fetch_error {
            println!("  {} {}: {}", "✘ Error:".red(), finding.result.resource, error);
        }
    }
}

/// List the first few pending updates
pub fn print_update_preview(updates: &[Reconciliation]) {
    println!();
    println!("Examples of updates needed:");
    for update in updates.iter().take(PREVIEW_LIMIT) {
        println!(
            "  {} {}: {} -> {}",
            status_marker(update.status),
            update.resource,
            update.current_label(),
            update.expected
        );
    }
    if updates.len() > PREVIEW_LIMIT {
        println!("  ... and {} more", updates.len() - PREVIEW_LIMIT);
    }
}

pub fn print_unmatched(selection: &Selection) {
    for unmatched in &selection.unmatched {
        println!(
            "{} Resource not found in implementation: {}",
            "✘".red(),
            unmatched.requested
        );
        if !unmatched.suggestions.is_empty() {
            println!("   Similar resources: {}", unmatched.suggestions.join(", "));
        }
    }
}

/// Current vs. expected for one checked resource
pub fn print_finding(finding: &Finding) {
    let result = &finding.result;
    println!();
    println!("{}", result.resource.as_str().bold());
    println!("   Current:  {}", result.current_label());
    println!("   Expected: {}", result.expected);
    if let Some(key) = &finding.pattern.semantic_key {
        println!("   Key:      {}", key);
    }
    if let Some(example) = &finding.pattern.example {
        println!("   Example:  {}", example);
    }
    println!("   Source:   {}", finding.pattern.provenance);
    if let Some(error) = &finding.fetch_error {
        println!("   {} {}", "✘ Error:".red(), error);
    }
    println!("   Status:   {} {}", status_marker(result.status), result.status);
    if result.needs_update {
        println!("   Suggested: {}", result.suggested_code.as_str().yellow());
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    coverage: &'a CoverageSummary,
    status_counts: BTreeMap<ReconcileStatus, usize>,
    findings: &'a [Finding],
}

/// Write the run as pretty-printed JSON
pub fn write_json_report(path: &Path, coverage: &CoverageSummary, run: &ValidationRun) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now(),
        coverage,
        status_counts: run.status_counts(),
        findings: &run.findings,
    };

    let content = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write report {:?}", path))?;
    tracing::info!("Wrote report to {:?}", path);
    Ok(())
}

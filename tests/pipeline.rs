//! End-to-end pipeline tests against an in-memory documentation source

use importsync::catalog::Catalog;
use importsync::config::MIN_FETCH_DELAY;
use importsync::dispatch::{extract, Dialect, ImplStatus};
use importsync::docs::{Complexity, DocSource, FetchOutcome, Provenance};
use importsync::pipeline::{self, Stage, Validator};
use importsync::reconcile::ReconcileStatus;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// Serves fixed pages and records when each resource type was requested
#[derive(Default)]
struct StaticDocs {
    pages: HashMap<String, FetchOutcome>,
    calls: Rc<RefCell<Vec<(String, Instant)>>>,
}

impl StaticDocs {
    fn with_page(mut self, resource_type: &str, import_body: &str) -> Self {
        self.pages.insert(
            resource_type.to_string(),
            FetchOutcome::Found(format!(
                "# Resource: {resource_type}\n\n## Import\n\n{import_body}\n"
            )),
        );
        self
    }

    fn with_failure(mut self, resource_type: &str, message: &str) -> Self {
        self.pages.insert(
            resource_type.to_string(),
            FetchOutcome::Failed(message.to_string()),
        );
        self
    }
}

impl DocSource for StaticDocs {
    async fn fetch(&self, resource_type: &str) -> FetchOutcome {
        self.calls
            .borrow_mut()
            .push((resource_type.to_string(), Instant::now()));
        self.pages
            .get(resource_type)
            .cloned()
            .unwrap_or(FetchOutcome::NotFound)
    }
}

const NAME_KEYED: &str = "Import gadgets using the `name`. For example:\n\n```console\n% terraform import a_gadget.example my-gadget\n```";

const MULTI_PART: &str = "Import bolts using the `project`. For example:\n\n```console\n% terraform import a_bolt.example proj/zone/bolt-1\n```";

const WITH_CATCH_ALL: &str = r#"import { something } from './other.js';

function generateTerraformImportId(resourceType, physicalId, resourceData) {
    switch (resourceType) {
        case 'a_widget':
            return resourceData.WidgetName;
        case 'a_bolt':
            return physicalId;
        // case 'a_gadget':
        //     return resourceData.Name;
        default:
            return physicalId;
    }
}

export { generateTerraformImportId };
"#;

const WITHOUT_CATCH_ALL: &str = r#"function generateTerraformImportId(resourceType, physicalId, resourceData) {
    switch (resourceType) {
        case 'a_widget':
            return `${resourceData.Zone}/${physicalId}`;
    }
    return null;
}
"#;

fn dialect() -> Dialect {
    Dialect::default()
}

#[tokio::test(start_paused = true)]
async fn test_fetches_are_sequential_and_spaced() {
    let docs = StaticDocs::default();
    let calls = Rc::clone(&docs.calls);
    let validator = Validator::new(docs, dialect(), Duration::ZERO);
    assert_eq!(validator.delay(), MIN_FETCH_DELAY);

    let catalog = Catalog::parse("a_widget\na_thing\na_gadget\n");
    let implemented = extract::extract(WITHOUT_CATCH_ALL, &catalog, &dialect()).unwrap();

    let mut progress = Vec::new();
    let started = Instant::now();
    let run = validator
        .validate(&catalog, &implemented, |p| {
            progress.push((p.stage, p.index, p.total, p.resource.to_string()))
        })
        .await;

    assert!(started.elapsed() >= MIN_FETCH_DELAY * 3);
    assert_eq!(
        progress,
        vec![
            (Stage::Implemented, 1, 1, "a_widget".to_string()),
            (Stage::Missing, 1, 2, "a_gadget".to_string()),
            (Stage::Missing, 2, 2, "a_thing".to_string()),
        ]
    );

    let calls = calls.borrow();
    let order: Vec<&str> = calls.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(order, vec!["a_widget", "a_gadget", "a_thing"]);
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= MIN_FETCH_DELAY);
    }

    let statuses: Vec<ReconcileStatus> = run.results().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ReconcileStatus::ReviewNeeded,
            ReconcileStatus::Missing,
            ReconcileStatus::Missing,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_validation_scenario() {
    let docs = StaticDocs::default()
        .with_page("a_gadget", NAME_KEYED)
        .with_page("a_bolt", MULTI_PART);
    let validator = Validator::new(docs, dialect(), MIN_FETCH_DELAY);

    let catalog = Catalog::parse("a_widget\na_gadget\na_bolt\n");
    let implemented = extract::extract(WITH_CATCH_ALL, &catalog, &dialect()).unwrap();
    assert_eq!(implemented["a_widget"], ImplStatus::Complex);
    assert_eq!(implemented["a_bolt"], ImplStatus::Simple);
    assert_eq!(implemented["a_gadget"], ImplStatus::DefaultCase);

    let run = validator.validate(&catalog, &implemented, |_| {}).await;
    let by_name: HashMap<&str, _> = run
        .findings
        .iter()
        .map(|f| (f.result.resource.as_str(), f))
        .collect();

    let gadget = &by_name["a_gadget"];
    assert_eq!(gadget.result.status, ReconcileStatus::Incorrect);
    assert_eq!(gadget.result.current_label(), "simple (via default case)");
    assert_eq!(gadget.pattern.complexity, Complexity::SimpleName);

    let widget = &by_name["a_widget"];
    assert_eq!(widget.result.status, ReconcileStatus::ReviewNeeded);
    assert_eq!(widget.pattern.provenance, Provenance::Default);
    assert!(!widget.result.needs_update);

    let bolt = &by_name["a_bolt"];
    assert_eq!(bolt.result.status, ReconcileStatus::Incorrect);
    assert_eq!(bolt.pattern.complexity, Complexity::Complex);
    assert!(bolt.result.suggested_code.contains("proj/zone/bolt-1"));

    let counts = run.status_counts();
    assert_eq!(counts[&ReconcileStatus::Incorrect], 2);
    assert_eq!(counts[&ReconcileStatus::ReviewNeeded], 1);
    assert_eq!(run.updates().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_check_uses_current_status() {
    let docs = StaticDocs::default().with_page("a_gadget", NAME_KEYED);
    let validator = Validator::new(docs, dialect(), MIN_FETCH_DELAY);

    let catalog = Catalog::parse("a_widget\na_gadget\n");
    let implemented = extract::extract(WITH_CATCH_ALL, &catalog, &dialect()).unwrap();

    let selection = pipeline::select_resources(&["a_*".to_string()], &implemented);
    assert_eq!(selection.resources, vec!["a_bolt", "a_gadget", "a_widget"]);

    let findings = validator.check(&selection.resources, &implemented).await;
    assert_eq!(findings.len(), 3);
    assert_eq!(findings[0].result.status, ReconcileStatus::Correct);
    assert_eq!(findings[1].result.status, ReconcileStatus::Incorrect);
    assert_eq!(findings[2].result.status, ReconcileStatus::ReviewNeeded);
}

#[tokio::test(start_paused = true)]
async fn test_update_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.js");
    std::fs::write(&path, WITH_CATCH_ALL).unwrap();

    let docs = StaticDocs::default()
        .with_page("a_gadget", NAME_KEYED)
        .with_page("a_bolt", MULTI_PART);
    let catalog = Catalog::parse("a_widget\na_gadget\na_bolt\n");
    let implemented = extract::extract_file(&path, &catalog, &dialect()).unwrap();

    let validator = Validator::new(docs, dialect(), MIN_FETCH_DELAY);
    let run = validator.validate(&catalog, &implemented, |_| {}).await;

    let outcome = pipeline::apply_updates(&path, &run, &catalog, &dialect()).unwrap();
    assert_eq!(outcome.patch.resources, 2);
    assert_eq!(outcome.coverage.covered, 3);
    assert!((outcome.coverage.coverage_pct - 100.0).abs() < f64::EPSILON);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("import { something } from './other.js';\n"));
    assert!(written.ends_with("export { generateTerraformImportId };\n"));
    assert!(written.contains("return resourceData?.Name || physicalId;"));

    let patched = extract::extract_file(&path, &catalog, &dialect()).unwrap();
    assert_eq!(patched["a_gadget"], ImplStatus::Complex);
    assert_eq!(patched["a_bolt"], ImplStatus::Complex);

    let rerun = validator.validate(&catalog, &patched, |_| {}).await;
    for result in rerun.results() {
        assert!(
            matches!(
                result.status,
                ReconcileStatus::Correct
                    | ReconcileStatus::ProbablyCorrect
                    | ReconcileStatus::ReviewNeeded
            ),
            "{} is {}",
            result.resource,
            result.status
        );
        assert!(!result.needs_update);
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_resources_are_added() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.js");
    std::fs::write(&path, WITHOUT_CATCH_ALL).unwrap();

    let docs = StaticDocs::default().with_page("a_gadget", NAME_KEYED);
    let catalog = Catalog::parse("a_widget\na_gadget\na_thing\n");
    let implemented = extract::extract_file(&path, &catalog, &dialect()).unwrap();

    let validator = Validator::new(docs, dialect(), MIN_FETCH_DELAY);
    let run = validator.validate(&catalog, &implemented, |_| {}).await;
    assert_eq!(run.updates().len(), 2);

    let outcome = pipeline::apply_updates(&path, &run, &catalog, &dialect()).unwrap();
    assert!((outcome.coverage.coverage_pct - 100.0).abs() < f64::EPSILON);

    let patched = extract::extract_file(&path, &catalog, &dialect()).unwrap();
    assert_eq!(patched["a_gadget"], ImplStatus::Complex);
    assert_eq!(patched["a_thing"], ImplStatus::Simple);

    let rerun = validator.check(&["a_gadget".to_string(), "a_thing".to_string()], &patched).await;
    assert_eq!(rerun[0].result.status, ReconcileStatus::ProbablyCorrect);
    assert_eq!(rerun[1].result.status, ReconcileStatus::Correct);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_is_reported_not_fatal() {
    let docs = StaticDocs::default()
        .with_page("a_gadget", NAME_KEYED)
        .with_failure("a_bolt", "operation timed out");
    let validator = Validator::new(docs, dialect(), MIN_FETCH_DELAY);

    let catalog = Catalog::parse("a_widget\na_gadget\na_bolt\n");
    let implemented = extract::extract(WITH_CATCH_ALL, &catalog, &dialect()).unwrap();
    let run = validator.validate(&catalog, &implemented, |_| {}).await;
    assert_eq!(run.findings.len(), 3);

    let failures: Vec<_> = run.fetch_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].result.resource, "a_bolt");
    assert_eq!(failures[0].fetch_error.as_deref(), Some("operation timed out"));
    assert_eq!(failures[0].pattern.provenance, Provenance::Error);
    assert_eq!(failures[0].result.status, ReconcileStatus::Correct);

    let counts = run.provenance_counts();
    assert_eq!(counts[&Provenance::Error], 1);
    assert_eq!(counts[&Provenance::Default], 1);
    assert_eq!(counts[&Provenance::GithubAnalysis], 1);

    let json = serde_json::to_value(&run).unwrap();
    let bolt = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["result"]["resource"] == "a_bolt")
        .unwrap();
    assert_eq!(bolt["fetch_error"], "operation timed out");
}

//! Pattern Classifier
//!
//! Reads the `## Import` section of a documentation page and decides what
//! shape the resource's import identifier has. Each parsing stage returns a
//! tagged result so every fallback is an explicit match arm:
//!
//! - no page, or a failed fetch -> `simple` (default / error)
//! - no import section -> `simple` (no_import_section)
//! - `id`/`arn`/no key -> `simple`
//! - name-like key -> `simple_name` with a field extraction
//! - other key -> `complex` by example separators, else `simple`

use super::fetcher::FetchOutcome;
use crate::dispatch::Dialect;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// "import ... using the `key`"
static SEMANTIC_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)import [^`]*using the [`'"]([^`'"\s]+)[`'"]"#).unwrap()
});

static IMPORT_COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)terraform import [^\n\r]+").unwrap());

/// Import argument styles, tried in order: double-quoted, single-quoted, bare
static IMPORT_ARG_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#"terraform import\s+\S+\s+"([^"]+)""#).unwrap(),
        Regex::new(r"terraform import\s+\S+\s+'([^']+)'").unwrap(),
        Regex::new(r"terraform import\s+\S+\s+(\S+)").unwrap(),
    ]
});

/// Keys whose value is a name-like field of the resource
const NAME_KEYS: &[&str] = &[
    "name",
    "role_name",
    "function_name",
    "group_name",
    "bucket",
    "bucket_name",
];

/// Keys satisfied by the physical identifier itself
const PHYSICAL_KEYS: &[&str] = &["id", "arn"];

/// Expected complexity of a resource's import identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    SimpleName,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::SimpleName => "simple_name",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Separator structure of a complex example identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexShape {
    /// `a/b`
    TwoPart,
    /// `a/b/c...`
    MultiPart,
    /// `a:b`
    Colon,
    /// `a_b`
    Underscore,
}

impl ComplexShape {
    /// Shape of an example identifier, if it has any separator
    pub fn of(example: &str) -> Option<Self> {
        if example.contains('/') {
            match example.split('/').count() {
                2 => Some(Self::TwoPart),
                _ => Some(Self::MultiPart),
            }
        } else if example.contains(':') {
            Some(Self::Colon)
        } else if example.contains('_') {
            Some(Self::Underscore)
        } else {
            None
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::TwoPart => "2-part",
            Self::MultiPart => "multi-part",
            Self::Colon => "colon-separated",
            Self::Underscore => "underscore",
        }
    }

    /// Placeholder return annotated with the literal example
    fn placeholder(&self, example: &str) -> String {
        format!(
            "return \"TODO: Implement {} pattern\"; // Example: {}",
            self.label(),
            example
        )
    }
}

/// Why a pattern was classified the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Derived from the page's import section
    GithubAnalysis,
    /// Page exists but has no import section
    NoImportSection,
    /// No page was found
    Default,
    /// The fetch failed
    Error,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubAnalysis => "github_analysis",
            Self::NoImportSection => "no_import_section",
            Self::Default => "default",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the documentation says a resource's import identifier looks like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedPattern {
    pub semantic_key: Option<String>,
    pub example: Option<String>,
    pub complexity: Complexity,
    pub shape: Option<ComplexShape>,
    pub suggested_code: String,
    pub provenance: Provenance,
}

impl ExpectedPattern {
    /// Conservative pattern: the physical identifier as-is
    pub fn simple(provenance: Provenance, dialect: &Dialect) -> Self {
        Self {
            semantic_key: None,
            example: None,
            complexity: Complexity::Simple,
            shape: None,
            suggested_code: dialect.bare_return(),
            provenance,
        }
    }
}

/// Outcome of locating the import section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSection<'a> {
    Found(&'a str),
    Missing,
}

/// Outcome of scanning for the semantic key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScan {
    Found(String),
    NotFound,
}

/// Outcome of scanning for an example import identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleScan {
    Found(String),
    NotFound,
}

/// Everything the classifier learned from a documentation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    NoPage,
    FetchFailed,
    NoImportSection,
    Section { key: KeyScan, example: ExampleScan },
}

impl Evidence {
    /// Parse page text through every stage
    pub fn from_page(page: &str) -> Self {
        match find_import_section(page) {
            ImportSection::Missing => Self::NoImportSection,
            ImportSection::Found(section) => Self::Section {
                key: find_semantic_key(section),
                example: find_example(section),
            },
        }
    }

    pub fn from_outcome(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Found(page) => Self::from_page(page),
            FetchOutcome::NotFound => Self::NoPage,
            FetchOutcome::Failed(_) => Self::FetchFailed,
        }
    }
}

/// Text of the `## Import` section, up to the next heading of level one or
/// two. Headings inside fenced code blocks don't count.
pub fn find_import_section(page: &str) -> ImportSection<'_> {
    let mut offset = 0;
    let mut section_start = None;
    let mut in_fence = false;

    for line in page.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence {
            match section_start {
                None if is_import_heading(trimmed) => section_start = Some(offset + line.len()),
                Some(start) if is_top_heading(trimmed) => {
                    return ImportSection::Found(page[start..offset].trim());
                }
                _ => {}
            }
        }
        offset += line.len();
    }

    match section_start {
        Some(start) => ImportSection::Found(page[start..].trim()),
        None => ImportSection::Missing,
    }
}

fn is_import_heading(line: &str) -> bool {
    line.strip_prefix("##")
        .filter(|rest| rest.starts_with([' ', '\t']))
        .is_some_and(|rest| rest.trim() == "Import")
}

fn is_top_heading(line: &str) -> bool {
    let hashes = line.len() - line.trim_start_matches('#').len();
    let after = line[hashes..].chars().next();
    (1..=2).contains(&hashes) && after.map_or(true, char::is_whitespace)
}

/// First key referenced as "import ... using the `<key>`"
pub fn find_semantic_key(section: &str) -> KeyScan {
    SEMANTIC_KEY_RE
        .captures(section)
        .map(|caps| KeyScan::Found(caps[1].to_string()))
        .unwrap_or(KeyScan::NotFound)
}

/// First literal `terraform import` argument inside a fenced block.
/// Arguments with template placeholders are skipped.
pub fn find_example(section: &str) -> ExampleScan {
    fenced_blocks(section)
        .into_iter()
        .flat_map(|block| IMPORT_COMMAND_RE.find_iter(block))
        .filter_map(|command| import_argument(command.as_str()))
        .find(|arg| !arg.contains(['$', '{', '}']))
        .map(ExampleScan::Found)
        .unwrap_or(ExampleScan::NotFound)
}

/// Argument of one import command, using the first quoting style that matches
fn import_argument(command: &str) -> Option<String> {
    IMPORT_ARG_RES
        .iter()
        .find_map(|re| re.captures(command))
        .map(|caps| caps[1].trim().to_string())
}

/// Contents of every fenced code block, any info string
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut offset = 0;
    let mut open: Option<usize> = None;

    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            match open.take() {
                Some(start) => blocks.push(&text[start..offset]),
                None => open = Some(offset + line.len()),
            }
        }
        offset += line.len();
    }

    blocks
}

/// Classify a fetch outcome for `resource_type`
pub fn classify_outcome(
    resource_type: &str,
    outcome: &FetchOutcome,
    dialect: &Dialect,
) -> ExpectedPattern {
    classify(resource_type, Evidence::from_outcome(outcome), dialect)
}

/// Map gathered evidence to an expected pattern
pub fn classify(resource_type: &str, evidence: Evidence, dialect: &Dialect) -> ExpectedPattern {
    match evidence {
        Evidence::NoPage => ExpectedPattern::simple(Provenance::Default, dialect),
        Evidence::FetchFailed => ExpectedPattern::simple(Provenance::Error, dialect),
        Evidence::NoImportSection => ExpectedPattern::simple(Provenance::NoImportSection, dialect),
        Evidence::Section { key, example } => classify_section(resource_type, key, example, dialect),
    }
}

fn classify_section(
    resource_type: &str,
    key: KeyScan,
    example: ExampleScan,
    dialect: &Dialect,
) -> ExpectedPattern {
    let key = match key {
        KeyScan::Found(key) => Some(key),
        KeyScan::NotFound => None,
    };
    let example = match example {
        ExampleScan::Found(example) => Some(example),
        ExampleScan::NotFound => None,
    };
    let normalized = key.as_deref().map(str::to_lowercase);

    let base = ExpectedPattern {
        semantic_key: key.clone(),
        example: example.clone(),
        ..ExpectedPattern::simple(Provenance::GithubAnalysis, dialect)
    };

    match normalized.as_deref() {
        None => base,
        Some(k) if PHYSICAL_KEYS.contains(&k) => base,
        Some(k) if NAME_KEYS.contains(&k) => ExpectedPattern {
            complexity: Complexity::SimpleName,
            suggested_code: dialect.field_return(name_field(resource_type, k)),
            ..base
        },
        Some(k) => match example.as_deref().and_then(|ex| ComplexShape::of(ex).map(|s| (ex, s))) {
            Some((ex, shape)) => ExpectedPattern {
                complexity: Complexity::Complex,
                shape: Some(shape),
                suggested_code: shape.placeholder(ex),
                ..base
            },
            None => {
                tracing::debug!(
                    "{}: key `{}` without a structured example, assuming simple",
                    resource_type,
                    k
                );
                base
            }
        },
    }
}

/// Resource property holding the name a name-keyed import expects
fn name_field(resource_type: &str, key: &str) -> &'static str {
    if resource_type.contains("lambda") || resource_type.contains("function") {
        "FunctionName"
    } else if resource_type.contains("iam_role") || key == "role_name" {
        "RoleName"
    } else if resource_type.contains("s3") || key == "bucket" || key == "bucket_name" {
        "BucketName"
    } else {
        "Name"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(import_body: &str) -> String {
        format!(
            "---\nsubcategory: \"Test\"\n---\n\n# Resource: aws_thing\n\n## Argument Reference\n\n* `name` - (Required)\n\n## Import\n\n{}\n",
            import_body
        )
    }

    fn classify_page(resource_type: &str, text: &str) -> ExpectedPattern {
        classify_outcome(
            resource_type,
            &FetchOutcome::Found(text.to_string()),
            &Dialect::default(),
        )
    }

    #[test]
    fn test_no_page_is_default_simple() {
        let pattern = classify_outcome("a_gadget", &FetchOutcome::NotFound, &Dialect::default());
        assert_eq!(pattern.complexity, Complexity::Simple);
        assert_eq!(pattern.provenance, Provenance::Default);
        assert_eq!(pattern.suggested_code, "return physicalId;");
    }

    #[test]
    fn test_failed_fetch_is_error_simple() {
        let outcome = FetchOutcome::Failed("timed out".to_string());
        let pattern = classify_outcome("a_gadget", &outcome, &Dialect::default());
        assert_eq!(pattern.complexity, Complexity::Simple);
        assert_eq!(pattern.provenance, Provenance::Error);
    }

    #[test]
    fn test_missing_import_section() {
        let pattern = classify_page("a_gadget", "# Resource\n\n## Argument Reference\n");
        assert_eq!(pattern.complexity, Complexity::Simple);
        assert_eq!(pattern.provenance, Provenance::NoImportSection);
    }

    #[test]
    fn test_import_section_stops_at_next_heading() {
        let text = "## Import\n\nimport using the `name`\n\n```console\n# a shell comment\n```\n\n## Timeouts\n\nusing the `arn`\n";
        let ImportSection::Found(section) = find_import_section(text) else {
            panic!("expected import section");
        };
        assert!(section.contains("# a shell comment"));
        assert!(!section.contains("Timeouts"));
    }

    #[test]
    fn test_gadget_name_key_is_simple_name() {
        let text = page(
            "Using `terraform import`, import Gadgets using the `name`. For example:\n\n```console\n% terraform import aws_gadget.example my-gadget\n```",
        );
        let pattern = classify_page("a_gadget", &text);
        assert_eq!(pattern.complexity, Complexity::SimpleName);
        assert_eq!(pattern.semantic_key.as_deref(), Some("name"));
        assert_eq!(pattern.example.as_deref(), Some("my-gadget"));
        assert_eq!(pattern.suggested_code, "return resourceData?.Name || physicalId;");
        assert_eq!(pattern.provenance, Provenance::GithubAnalysis);
    }

    #[test]
    fn test_name_field_heuristics() {
        let text = page("import Things using the `name`.");
        assert_eq!(
            classify_page("aws_lambda_function", &text).suggested_code,
            "return resourceData?.FunctionName || physicalId;"
        );
        assert_eq!(
            classify_page("aws_iam_role", &text).suggested_code,
            "return resourceData?.RoleName || physicalId;"
        );
        assert_eq!(
            classify_page("aws_s3_bucket", &text).suggested_code,
            "return resourceData?.BucketName || physicalId;"
        );
        let role_key = page("import Profiles using the `role_name`.");
        assert_eq!(
            classify_page("aws_thing", &role_key).suggested_code,
            "return resourceData?.RoleName || physicalId;"
        );
    }

    #[test]
    fn test_id_and_arn_keys_are_simple() {
        for key in ["id", "arn", "ARN"] {
            let text = page(&format!(
                "import Things using the `{}`.\n\n```\nterraform import aws_thing.example a/b\n```",
                key
            ));
            let pattern = classify_page("aws_thing", &text);
            assert_eq!(pattern.complexity, Complexity::Simple, "key {}", key);
        }
    }

    #[test]
    fn test_multi_part_example() {
        let text = page(
            "Import Instances using the `project`, `region` and `name` separated by a slash:\n\n```shell\n$ terraform import aws_instance_thing.example projectA/regionB/instanceC\n```",
        );
        let pattern = classify_page("aws_instance_thing", &text);
        assert_eq!(pattern.complexity, Complexity::Complex);
        assert_eq!(pattern.shape, Some(ComplexShape::MultiPart));
        assert!(pattern.suggested_code.contains("TODO"));
        assert!(pattern.suggested_code.contains("projectA/regionB/instanceC"));
    }

    #[test]
    fn test_shapes() {
        assert_eq!(ComplexShape::of("a/b"), Some(ComplexShape::TwoPart));
        assert_eq!(ComplexShape::of("a/b/c/d"), Some(ComplexShape::MultiPart));
        assert_eq!(ComplexShape::of("a:b"), Some(ComplexShape::Colon));
        assert_eq!(ComplexShape::of("a_b"), Some(ComplexShape::Underscore));
        assert_eq!(ComplexShape::of("a-b"), None);
    }

    #[test]
    fn test_quoted_examples_preferred_and_placeholders_skipped() {
        let section = "```\nterraform import aws_thing.a \"${var.id}\"\nterraform import aws_thing.b 'db:main'\n```";
        assert_eq!(find_example(section), ExampleScan::Found("db:main".to_string()));

        let section = "```\nterraform import aws_thing.a \"vpc-1 / rule\"\n```";
        assert_eq!(find_example(section), ExampleScan::Found("vpc-1 / rule".to_string()));
    }

    #[test]
    fn test_examples_outside_fences_are_ignored() {
        let section = "Run terraform import aws_thing.a a/b to import.\n";
        assert_eq!(find_example(section), ExampleScan::NotFound);
    }

    #[test]
    fn test_unknown_key_without_example_stays_simple() {
        let text = page("import Things using the `cluster_identifier`.");
        let pattern = classify_page("aws_thing", &text);
        assert_eq!(pattern.complexity, Complexity::Simple);
        assert_eq!(pattern.semantic_key.as_deref(), Some("cluster_identifier"));
    }

    #[test]
    fn test_no_key_with_complex_example_stays_simple() {
        let text = page("```\nterraform import aws_thing.example a/b\n```");
        assert_eq!(classify_page("aws_thing", &text).complexity, Complexity::Simple);
    }

    #[test]
    fn test_import_block_example_is_not_a_command() {
        let section = "```terraform\nimport {\n  to = aws_thing.example\n  id = \"a/b\"\n}\n```";
        assert_eq!(find_example(section), ExampleScan::NotFound);
    }
}

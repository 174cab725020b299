//! Reconciler
//!
//! Compares how the dispatch table builds a resource's import identifier with
//! what the documentation expects.
//!
//! Hand-written complex branches are trusted, not verified: they come out as
//! [`ReconcileStatus::ProbablyCorrect`], never [`ReconcileStatus::Correct`].

use crate::dispatch::ImplStatus;
use crate::docs::{Complexity, ExpectedPattern};
use serde::Serialize;
use std::fmt;

/// Outcome of comparing current and expected implementations.
/// Variants are declared in name order so sorted collections list them
/// alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// Current simple implementation matches a simple expectation
    Correct,
    /// Simple implementation where the documentation expects more
    Incorrect,
    /// No usable branch
    Missing,
    /// Complex hand-written logic, trusted without verification
    ProbablyCorrect,
    /// Needs a human to look at it
    ReviewNeeded,
}

impl ReconcileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::ProbablyCorrect => "probably_correct",
            Self::Incorrect => "incorrect",
            Self::Missing => "missing",
            Self::ReviewNeeded => "review_needed",
        }
    }

    /// Human-readable title, e.g. "Probably Correct"
    pub fn title(&self) -> &'static str {
        match self {
            Self::Correct => "Correct",
            Self::ProbablyCorrect => "Probably Correct",
            Self::Incorrect => "Incorrect",
            Self::Missing => "Missing",
            Self::ReviewNeeded => "Review Needed",
        }
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation of one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub resource: String,
    pub status: ReconcileStatus,
    /// Current implementation; `None` when the dispatch table has no entry
    pub current: Option<ImplStatus>,
    pub expected: Complexity,
    pub needs_update: bool,
    pub suggested_code: String,
}

impl Reconciliation {
    /// Current implementation as shown to users
    pub fn current_label(&self) -> &'static str {
        match self.current {
            Some(ImplStatus::DefaultCase) => "simple (via default case)",
            Some(status) => status.as_str(),
            None => "missing",
        }
    }
}

/// Status and update flag for a current/expected pair
pub fn decide(current: Option<ImplStatus>, expected: Complexity) -> (ReconcileStatus, bool) {
    // The catch-all returns the physical identifier, so it behaves as simple
    let current = match current {
        Some(ImplStatus::DefaultCase) => Some(ImplStatus::Simple),
        other => other,
    };

    match (current, expected) {
        (Some(ImplStatus::Simple), Complexity::Simple) => (ReconcileStatus::Correct, false),
        (Some(ImplStatus::Complex), Complexity::Complex | Complexity::SimpleName) => {
            (ReconcileStatus::ProbablyCorrect, false)
        }
        (Some(ImplStatus::Simple), Complexity::Complex | Complexity::SimpleName) => {
            (ReconcileStatus::Incorrect, true)
        }
        (Some(ImplStatus::Fallthrough) | None, _) => (ReconcileStatus::Missing, true),
        _ => (ReconcileStatus::ReviewNeeded, false),
    }
}

/// Reconcile one resource's current implementation with its expected pattern
pub fn reconcile(
    resource: &str,
    current: Option<ImplStatus>,
    expected: &ExpectedPattern,
) -> Reconciliation {
    let (status, needs_update) = decide(current, expected.complexity);
    Reconciliation {
        resource: resource.to_string(),
        status,
        current,
        expected: expected.complexity,
        needs_update,
        suggested_code: expected.suggested_code.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dialect;
    use crate::docs::Provenance;

    const CURRENTS: [Option<ImplStatus>; 5] = [
        Some(ImplStatus::Simple),
        Some(ImplStatus::Complex),
        Some(ImplStatus::Fallthrough),
        Some(ImplStatus::DefaultCase),
        None,
    ];

    const EXPECTEDS: [Complexity; 3] = [
        Complexity::Simple,
        Complexity::SimpleName,
        Complexity::Complex,
    ];

    fn expected_table(current: Option<ImplStatus>, expected: Complexity) -> (ReconcileStatus, bool) {
        use Complexity as E;
        use ImplStatus as C;
        match (current, expected) {
            (Some(C::Simple | C::DefaultCase), E::Simple) => (ReconcileStatus::Correct, false),
            (Some(C::Simple | C::DefaultCase), _) => (ReconcileStatus::Incorrect, true),
            (Some(C::Complex), E::Simple) => (ReconcileStatus::ReviewNeeded, false),
            (Some(C::Complex), _) => (ReconcileStatus::ProbablyCorrect, false),
            (Some(C::Fallthrough) | None, _) => (ReconcileStatus::Missing, true),
        }
    }

    #[test]
    fn test_decision_table_is_total() {
        for current in CURRENTS {
            for expected in EXPECTEDS {
                assert_eq!(
                    decide(current, expected),
                    expected_table(current, expected),
                    "{:?} vs {:?}",
                    current,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_decisions_are_repeatable() {
        for current in CURRENTS.iter().rev() {
            for expected in EXPECTEDS.iter().rev() {
                let first = decide(*current, *expected);
                assert_eq!(first, decide(*current, *expected));
            }
        }
    }

    #[test]
    fn test_default_case_gadget_needs_name() {
        let expected = ExpectedPattern {
            semantic_key: Some("name".to_string()),
            example: Some("my-gadget".to_string()),
            complexity: Complexity::SimpleName,
            shape: None,
            suggested_code: "return resourceData?.Name || physicalId;".to_string(),
            provenance: Provenance::GithubAnalysis,
        };
        let result = reconcile("a_gadget", Some(ImplStatus::DefaultCase), &expected);

        assert_eq!(result.status, ReconcileStatus::Incorrect);
        assert!(result.needs_update);
        assert_eq!(result.current_label(), "simple (via default case)");
        assert_eq!(result.suggested_code, expected.suggested_code);
    }

    #[test]
    fn test_absent_entry_is_missing() {
        let expected = ExpectedPattern::simple(Provenance::Default, &Dialect::default());
        let result = reconcile("a_gadget", None, &expected);
        assert_eq!(result.status, ReconcileStatus::Missing);
        assert!(result.needs_update);
        assert_eq!(result.current_label(), "missing");
    }
}

//! Provider documentation
//!
//! Fetches a resource type's documentation page and infers what its import
//! identifier should look like.
//!
//! # Module Structure
//!
//! - [`fetcher`] - [`DocSource`] trait and the HTTP implementation
//! - [`classifier`] - Import-section parsing and complexity classification

pub mod classifier;
pub mod fetcher;

pub use classifier::{classify_outcome, Complexity, ComplexShape, ExpectedPattern, Provenance};
pub use fetcher::{DocSource, DocsClient, FetchOutcome};

//! importsync
//!
//! Reconciles a Terraform import-ID dispatch table against the import
//! conventions published in the provider's documentation.
//!
//! # Module Structure
//!
//! - [`catalog`] - Canonical resource type names
//! - [`dispatch`] - Extraction from and patching of the dispatch table
//! - [`docs`] - Documentation fetching and import-pattern classification
//! - [`reconcile`] - Current vs. expected comparison
//! - [`pipeline`] - Validation runs, checks and update application
//! - [`report`] - Console and JSON output

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod report;

//! Dispatch-table analysis
//!
//! The dispatch table is a single routine in a source file whose body is a
//! `switch` over resource type names, each branch computing an import
//! identifier. This module reads it and writes it back.
//!
//! # Module Structure
//!
//! - [`scanner`] - Brace matching and comment masking over the raw source
//! - [`extract`] - Classifies every branch into an [`ImplStatus`]
//! - [`patch`] - Renders new branches and splices them before the catch-all
//!
//! # Example
//!
//! ```ignore
//! use importsync::dispatch::{extract, Dialect};
//!
//! let implemented = extract::extract(&source, &catalog, &Dialect::default())?;
//! ```

pub mod extract;
pub mod patch;
pub mod scanner;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Literal markers that locate the dispatch table inside the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Declaration prefix of the generation routine
    pub routine_marker: String,
    /// Expression naming the caller-supplied physical identifier
    pub physical_id: String,
    /// Expression naming the resource's properties inside the routine
    pub resource_data: String,
    /// Comment opening the block of branches that fall back to the physical identifier
    pub simple_block_marker: String,
    /// Keyword of the catch-all branch
    pub catch_all: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            routine_marker: "function generateTerraformImportId(".to_string(),
            physical_id: "physicalId".to_string(),
            resource_data: "resourceData".to_string(),
            simple_block_marker: "// Most resources use their physical ID directly".to_string(),
            catch_all: "default".to_string(),
        }
    }
}

impl Dialect {
    /// The statement returning the physical identifier unmodified
    pub fn bare_return(&self) -> String {
        format!("return {};", self.physical_id)
    }

    /// Statement returning a field of the resource, or the physical id when absent
    pub fn field_return(&self, field: &str) -> String {
        format!(
            "return {}?.{} || {};",
            self.resource_data, field, self.physical_id
        )
    }
}

/// How the dispatch table currently produces a resource's import identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplStatus {
    /// Explicit branch returning the physical identifier unmodified
    Simple,
    /// Explicit branch returning anything else
    Complex,
    /// Branch exists but exits without returning
    Fallthrough,
    /// No branch; covered by a catch-all that returns the physical identifier
    DefaultCase,
}

impl ImplStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
            Self::Fallthrough => "fallthrough",
            Self::DefaultCase => "default_case",
        }
    }
}

impl fmt::Display for ImplStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of every resource type known to the dispatch table
pub type ImplementationMap = BTreeMap<String, ImplStatus>;

//! Resource Catalog
//!
//! The authoritative list of canonical resource type names, one per line.

use crate::error::CatalogError;
use std::collections::BTreeSet;
use std::path::Path;

/// Canonical resource type names, ordered for deterministic iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    names: BTreeSet<String>,
}

impl Catalog {
    /// Load the catalog file. Blank lines are ignored and names are trimmed.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let catalog = Self::parse(&content);
        tracing::info!("Loaded {} resource types from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Parse catalog text
    pub fn parse(content: &str) -> Self {
        content.lines().map(str::trim).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Catalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty())
                .collect(),
        }
    }
}

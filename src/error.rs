//! Error taxonomy
//!
//! Catalog and source failures are fatal to the stages that need them.
//! Documentation fetch failures are not errors at all: they surface as
//! [`crate::docs::FetchOutcome`] values and degrade to a conservative pattern.

use std::path::PathBuf;
use thiserror::Error;

/// The resource catalog could not be loaded
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("resource catalog not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read resource catalog {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The dispatch-table source or its generation routine is unavailable
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("dispatch source not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read dispatch source {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation routine `{marker}` not found")]
    RoutineNotFound { marker: String },

    #[error("generation routine `{marker}` has unbalanced braces")]
    Unbalanced { marker: String },
}

/// Applying generated entries to the dispatch table failed.
/// The source file is left as it was before the attempt.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("no resources flagged for update")]
    NothingToInsert,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to write dispatch source {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = CatalogError::Missing {
            path: PathBuf::from("util/tf_resources.txt"),
        };
        assert!(err.to_string().contains("util/tf_resources.txt"));

        let err = SourceError::RoutineNotFound {
            marker: "function gen(".to_string(),
        };
        assert!(err.to_string().contains("function gen("));
    }

    #[test]
    fn test_patch_error_wraps_source_error() {
        let err: PatchError = SourceError::Unbalanced {
            marker: "function gen(".to_string(),
        }
        .into();
        assert!(matches!(err, PatchError::Source(SourceError::Unbalanced { .. })));
    }
}

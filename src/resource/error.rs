//! resource::error
//!
//! Errors surfaced by the file lifecycle.

use thiserror::Error;

use crate::commit::CommitError;
use crate::core::id::FormatError;
use crate::forge::ForgeError;

/// The lifecycle operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
        };
        f.write_str(name)
    }
}

/// Errors from lifecycle operations.
///
/// Every variant names the operation; all but `Format` also name the path.
#[derive(Debug, Error)]
pub enum FileError {
    /// Malformed identifier. Never retried.
    #[error("failed to {operation}: {cause}")]
    Format {
        operation: Operation,
        cause: FormatError,
    },

    /// The file is absent. `read` callers drop the file from tracked state.
    #[error("failed to {operation} {path:?}: file not found")]
    NotFound { operation: Operation, path: String },

    /// The remote failed for a reason other than absence.
    #[error("failed to {operation} {path:?}: {cause}")]
    Transport {
        operation: Operation,
        path: String,
        cause: ForgeError,
    },

    /// Every commit attempt failed.
    #[error("failed to {operation} {path:?}: failed to create commit: {cause}")]
    CommitFailed {
        operation: Operation,
        path: String,
        cause: CommitError,
    },
}

impl FileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_display() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert_eq!(Operation::Import.to_string(), "import");
    }

    #[test]
    fn messages_name_operation_path_and_cause() {
        let err = FileError::Transport {
            operation: Operation::Delete,
            path: "a/b.txt".into(),
            cause: ForgeError::RateLimited,
        };
        assert_eq!(err.to_string(), r#"failed to delete "a/b.txt": rate limited"#);

        let err = FileError::CommitFailed {
            operation: Operation::Update,
            path: "f".into(),
            cause: CommitError::Forge(ForgeError::NetworkError("reset".into())),
        };
        assert_eq!(
            err.to_string(),
            r#"failed to update "f": failed to create commit: network error: reset"#
        );
    }

    #[test]
    fn not_found() {
        let err = FileError::NotFound {
            operation: Operation::Import,
            path: "f".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), r#"failed to import "f": file not found"#);
        let err = FileError::Format {
            operation: Operation::Import,
            cause: FormatError("x".into()),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn format_names_operation() {
        let err = FileError::Format {
            operation: Operation::Import,
            cause: FormatError("x".into()),
        };
        assert_eq!(
            err.to_string(),
            r#"failed to import: failed to parse "x" as a file id"#
        );
    }
}

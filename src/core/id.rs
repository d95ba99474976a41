//! core::id
//!
//! The external identifier of a managed file.
//!
//! # Format
//!
//! ```text
//! <owner>/<repo>:<branch>:<path>
//! ```
//!
//! The identifier is the only state exported besides the key fields and
//! the contents, so the format must stay stable across releases: orchestrators
//! match and import resources by it.
//!
//! # Example
//!
//! ```
//! use githubfile::core::id::{decode, encode};
//! use githubfile::core::types::FileKey;
//!
//! let key = FileKey::new("form3tech-oss", "infra", "main", "teams/README.md");
//! let id = encode(&key);
//! assert_eq!(id, "form3tech-oss/infra:main:teams/README.md");
//! assert_eq!(decode(&id).unwrap(), key);
//! ```

use thiserror::Error;

use super::types::FileKey;

/// The identifier could not be split into its four components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to parse {0:?} as a file id")]
pub struct FormatError(pub String);

/// Encode a key as `<owner>/<repo>:<branch>:<path>`.
pub fn encode(key: &FileKey) -> String {
    format!(
        "{}/{}:{}:{}",
        key.repository_owner, key.repository_name, key.branch, key.path
    )
}

/// Decode an identifier produced by [`encode`].
///
/// Requires exactly three `:`-separated segments, the first of which holds
/// exactly one `/`. Components are otherwise taken as-is; empty ones are
/// accepted.
///
/// # Errors
///
/// Returns [`FormatError`] carrying the offending input.
pub fn decode(id: &str) -> Result<FileKey, FormatError> {
    let segments: Vec<&str> = id.split(':').collect();
    let [repository, branch, path] = segments[..] else {
        return Err(FormatError(id.to_string()));
    };

    let repository: Vec<&str> = repository.split('/').collect();
    let [owner, name] = repository[..] else {
        return Err(FormatError(id.to_string()));
    };

    Ok(FileKey::new(owner, name, branch, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod encode {
        use super::*;

        #[test]
        fn joins_components() {
            let key = FileKey::new("o", "r", "main", "f.txt");
            assert_eq!(encode(&key), "o/r:main:f.txt");
        }

        #[test]
        fn keeps_nested_paths() {
            let key = FileKey::new("o", "r", "feature/x", "a/b/c.txt");
            assert_eq!(encode(&key), "o/r:feature/x:a/b/c.txt");
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn splits_components() {
            let key = decode("o/r:main:a/b.txt").unwrap();
            assert_eq!(key.repository_owner, "o");
            assert_eq!(key.repository_name, "r");
            assert_eq!(key.branch, "main");
            assert_eq!(key.path, "a/b.txt");
        }

        #[test]
        fn rejects_missing_separators() {
            assert_eq!(
                decode("not-an-id"),
                Err(FormatError("not-an-id".to_string()))
            );
        }

        #[test]
        fn rejects_missing_path_segment() {
            assert!(decode("a/b:c").is_err());
        }

        #[test]
        fn rejects_extra_colon() {
            assert!(decode("o/r:main:a:b").is_err());
        }

        #[test]
        fn rejects_repository_without_owner() {
            assert!(decode("r:main:f.txt").is_err());
        }

        #[test]
        fn rejects_repository_with_two_slashes() {
            assert!(decode("o/r/x:main:f.txt").is_err());
        }

        #[test]
        fn accepts_empty_components() {
            let key = decode("/::").unwrap();
            assert_eq!(key, FileKey::new("", "", "", ""));
        }

        #[test]
        fn error_names_input() {
            let err = decode("a/b:c").unwrap_err();
            assert_eq!(err.to_string(), r#"failed to parse "a/b:c" as a file id"#);
        }
    }
}

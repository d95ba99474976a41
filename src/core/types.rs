//! core::types
//!
//! Value types for a managed file.
//!
//! # Types
//!
//! - [`FileKey`] - Owner, repository, branch and path of a file
//! - [`File`] - A key plus the file's contents
//! - [`RepoRef`] - Owner and name of a repository
//!
//! Files are never persisted locally. Every lifecycle call receives a `File`
//! or `FileKey` by reference and returns a freshly observed `File`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id;

/// Errors from key validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// A repository on the remote, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identifies a managed file.
///
/// No two reconciliations may run concurrently against the same key. All four
/// fields are immutable once the file has been created; changing any of them
/// means deleting one file and creating another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    pub repository_owner: String,
    pub repository_name: String,
    pub branch: String,
    pub path: String,
}

impl FileKey {
    pub fn new(
        repository_owner: impl Into<String>,
        repository_name: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            repository_owner: repository_owner.into(),
            repository_name: repository_name.into(),
            branch: branch.into(),
            path: path.into(),
        }
    }

    /// Check that every component is non-empty.
    ///
    /// Only desired-state input is validated; keys decoded from an identifier
    /// are passed through as they are.
    pub fn validate(&self) -> Result<(), TypeError> {
        let fields = [
            ("repository_owner", &self.repository_owner),
            ("repository_name", &self.repository_name),
            ("branch", &self.branch),
            ("path", &self.path),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(TypeError::Empty(name));
            }
        }
        Ok(())
    }

    /// The repository this file lives in.
    pub fn repo(&self) -> RepoRef {
        RepoRef::new(&self.repository_owner, &self.repository_name)
    }

    /// The external identifier, `<owner>/<repo>:<branch>:<path>`.
    pub fn id(&self) -> String {
        id::encode(self)
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id())
    }
}

/// A managed file: its key and its contents.
///
/// Serialises with the computed `id` alongside the attributes:
///
/// ```json
/// {
///   "id": "o/r:main:f.txt",
///   "repository_owner": "o",
///   "repository_name": "r",
///   "branch": "main",
///   "path": "f.txt",
///   "contents": "hi"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct File {
    #[serde(flatten)]
    pub key: FileKey,
    pub contents: String,
}

impl File {
    pub fn new(key: FileKey, contents: impl Into<String>) -> Self {
        Self {
            key,
            contents: contents.into(),
        }
    }

    pub fn id(&self) -> String {
        self.key.id()
    }

    pub fn path(&self) -> &str {
        &self.key.path
    }
}

impl Serialize for File {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("File", 6)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("repository_owner", &self.key.repository_owner)?;
        state.serialize_field("repository_name", &self.key.repository_name)?;
        state.serialize_field("branch", &self.key.branch)?;
        state.serialize_field("path", &self.key.path)?;
        state.serialize_field("contents", &self.contents)?;
        state.end()
    }
}

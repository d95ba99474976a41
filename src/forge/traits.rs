//! forge::traits
//!
//! Forge trait definition for the GitHub endpoints the reconciler needs.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O. It
//! exposes the contents endpoint for reads and the low-level git data
//! endpoints (refs, commits, trees) for writes, so that a single commit can
//! replace any number of tree entries atomically.
//!
//! All methods return `Result` and map the remote's "absent" answer to
//! [`ForgeError::NotFound`]; callers never compare against sentinel values.
//!
//! # Example
//!
//! ```ignore
//! use githubfile::core::types::RepoRef;
//! use githubfile::forge::Forge;
//!
//! async fn head_tree(forge: &dyn Forge) -> Result<String, ForgeError> {
//!     let repo = RepoRef::new("octocat", "hello-world");
//!     let head = forge.get_branch_sha(&repo, "main").await?;
//!     let commit = forge.get_commit(&repo, &head).await?;
//!     Ok(commit.tree_sha)
//! }
//! ```

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::RepoRef;

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API answered, but not with something we can use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ForgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }

    /// Whether a ref update was refused by branch protection rules.
    ///
    /// GitHub answers `422 Protected branch update failed` (or a 403 for some
    /// rule sets) instead of moving the ref.
    pub fn is_protected_branch_rejection(&self) -> bool {
        let message = match self {
            ForgeError::ApiError { status, message } if *status == 422 || *status == 403 => {
                message
            }
            ForgeError::AuthFailed(message) => message,
            _ => return false,
        };
        message.to_lowercase().contains("protected branch")
    }
}

/// Repository metadata. Only the fields the reconciler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub full_name: String,
    /// Archived repositories reject every write.
    pub archived: bool,
}

/// A file as returned by the contents endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    /// Blob SHA.
    pub sha: String,
    /// `base64` for files up to 1 MB, `none` above that.
    pub encoding: String,
    pub content: String,
}

impl FileContent {
    /// Build a content handle holding `text` in GitHub's base64 encoding.
    pub fn from_text(path: impl Into<String>, sha: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            sha: sha.into(),
            encoding: "base64".to_string(),
            content: base64::engine::general_purpose::STANDARD.encode(text),
        }
    }

    /// Decode the remote encoding into text.
    ///
    /// GitHub wraps base64 content at 60 columns, so whitespace is dropped
    /// before decoding.
    pub fn decoded(&self) -> Result<String, ForgeError> {
        let bytes = match self.encoding.as_str() {
            "base64" => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| {
                        ForgeError::InvalidResponse(format!(
                            "invalid base64 content for {:?}: {}",
                            self.path, e
                        ))
                    })?
            }
            "" | "utf-8" => self.content.clone().into_bytes(),
            "none" => {
                return Err(ForgeError::InvalidResponse(format!(
                    "{:?} is too large to be read through the contents API",
                    self.path
                )))
            }
            other => {
                return Err(ForgeError::InvalidResponse(format!(
                    "unsupported content encoding {:?} for {:?}",
                    other, self.path
                )))
            }
        };

        String::from_utf8(bytes).map_err(|_| {
            ForgeError::InvalidResponse(format!("{:?} is not valid UTF-8", self.path))
        })
    }
}

/// A git commit object (the parts we use).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommit {
    pub sha: String,
    pub tree_sha: String,
    pub parents: Vec<String>,
    pub message: String,
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule pointer.
    Commit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
            EntryKind::Commit => "commit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(EntryKind::Blob),
            "tree" => Some(EntryKind::Tree),
            "commit" => Some(EntryKind::Commit),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a tree entry's object comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Inline UTF-8 content; the remote creates the blob.
    Content(String),
    /// An existing object.
    Sha(String),
    /// Remove the path from the base tree (`"sha": null` on the wire).
    Delete,
}

/// One entry of a git tree, or one change in a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    pub kind: EntryKind,
    pub source: EntrySource,
}

/// File mode of a regular, non-executable file.
pub const REGULAR_FILE_MODE: &str = "100644";

impl TreeEntry {
    /// A regular file with inline contents.
    pub fn blob(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            kind: EntryKind::Blob,
            source: EntrySource::Content(contents.into()),
        }
    }

    /// Remove a regular file.
    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            kind: EntryKind::Blob,
            source: EntrySource::Delete,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind == EntryKind::Tree
    }
}

/// A tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub sha: String,
    pub entries: Vec<TreeEntry>,
    /// GitHub stops listing recursive trees past 100,000 entries.
    pub truncated: bool,
}

/// Request to create a tree.
#[derive(Debug, Clone)]
pub struct CreateTreeRequest {
    /// Tree to apply the entries on top of. `None` builds from scratch.
    pub base_tree: Option<String>,
    pub entries: Vec<TreeEntry>,
}

/// Author and committer of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// Request to create a commit object.
#[derive(Debug, Clone)]
pub struct CreateCommitRequest {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    /// Used as both author and committer.
    pub author: CommitAuthor,
    /// ASCII-armored detached signature over the commit payload.
    pub signature: Option<String>,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
}

/// The Forge trait for talking to the remote repository host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the reconciler shares one forge
/// across concurrent reconciliations of distinct files.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `NotFound`: the object is absent (drives state removal or no-ops)
/// - `AuthFailed`: the token is invalid or lacks permissions
/// - `RateLimited`, `NetworkError`, `ApiError`: transport failures
#[async_trait]
pub trait Forge: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, ForgeError>;

    /// Fetch a file from a branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path does not exist on the branch
    /// - `InvalidResponse` if the path is a directory
    async fn get_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> Result<FileContent, ForgeError>;

    /// Resolve the commit SHA a branch points at.
    async fn get_branch_sha(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError>;

    /// Fetch a commit object.
    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<GitCommit, ForgeError>;

    /// Fetch a tree, optionally listing every nested entry.
    async fn get_tree(&self, repo: &RepoRef, sha: &str, recursive: bool)
        -> Result<Tree, ForgeError>;

    /// Create a tree and return its SHA.
    async fn create_tree(
        &self,
        repo: &RepoRef,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError>;

    /// Create a commit object. Does not move any ref.
    async fn create_commit(
        &self,
        repo: &RepoRef,
        request: CreateCommitRequest,
    ) -> Result<GitCommit, ForgeError>;

    /// Fast-forward a branch to `sha`.
    ///
    /// Never forced: the remote rejects the update when `sha` does not
    /// descend from the branch's current head.
    async fn update_ref(&self, repo: &RepoRef, branch: &str, sha: &str)
        -> Result<(), ForgeError>;

    /// Create a branch pointing at `sha`.
    async fn create_ref(&self, repo: &RepoRef, branch: &str, sha: &str)
        -> Result<(), ForgeError>;

    /// Delete a branch.
    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError>;

    /// Open a pull request.
    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;

    /// Merge a pull request with a merge commit, so the original (possibly
    /// signed) commit lands unchanged.
    async fn merge_pr(&self, repo: &RepoRef, number: u64) -> Result<(), ForgeError>;
}

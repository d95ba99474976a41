//! resource
//!
//! The managed file lifecycle.
//!
//! # Architecture
//!
//! Each lifecycle call is one independent pass over remote state. Nothing is
//! cached between calls: the host passes in the desired file or its key and
//! gets back what the remote holds afterwards.
//!
//! ```text
//! host -> FileLifecycle -> { reader, tree, CommitDispatcher } -> Forge
//! ```
//!
//! # Modules
//!
//! - [`reader`] - Fetch contents, separating absence from failure
//! - [`tree`] - Remove one path from a recursive tree listing
//! - [`error`] - `FileError` and the operation it names
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use githubfile::commit::CommitSettings;
//! use githubfile::core::types::{File, FileKey};
//! use githubfile::forge::GitHubForge;
//! use githubfile::resource::{FileLifecycle, FileReconciler};
//!
//! let reconciler = FileReconciler::new(Arc::new(GitHubForge::new(token)), settings);
//! let key = FileKey::new("o", "r", "main", "f.txt");
//! let observed = reconciler.create(&File::new(key, "hi")).await?;
//! println!("{}", observed.id());
//! ```

pub mod error;
pub mod reader;
pub mod tree;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{FileError, Operation};
pub use reader::{read_file, ReadError};
pub use tree::remove_from_tree;

use crate::commit::{CommitDispatcher, CommitSettings, MessageTemplate, RetryPolicy};
use crate::core::id;
use crate::core::types::{File, FileKey};
use crate::forge::{Forge, ForgeError, TreeEntry};

/// Lifecycle operations on one managed file.
///
/// Calls for distinct keys may run concurrently. Calls for the same key
/// must not.
#[async_trait]
pub trait FileLifecycle: Send + Sync {
    /// Commit the desired contents and return the observed file.
    async fn create(&self, desired: &File) -> Result<File, FileError>;

    /// Observe the file. [`FileError::NotFound`] means it no longer exists.
    async fn read(&self, key: &FileKey) -> Result<File, FileError>;

    /// Commit the desired contents over the existing file.
    ///
    /// Always commits, even when the contents are unchanged.
    async fn update(&self, desired: &File) -> Result<File, FileError>;

    /// Remove the file. Succeeds without a commit when the repository is
    /// archived or the file is already absent.
    async fn delete(&self, key: &FileKey) -> Result<(), FileError>;

    /// Decode an identifier and observe the file it names.
    async fn import(&self, id: &str) -> Result<File, FileError>;
}

/// [`FileLifecycle`] against a [`Forge`].
#[derive(Clone)]
pub struct FileReconciler {
    forge: Arc<dyn Forge>,
    dispatcher: CommitDispatcher,
}

impl FileReconciler {
    pub fn new(forge: Arc<dyn Forge>, settings: CommitSettings) -> Self {
        let dispatcher = CommitDispatcher::new(Arc::clone(&forge), settings);
        Self { forge, dispatcher }
    }

    /// Override the commit retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.dispatcher = self.dispatcher.with_retry_policy(retry);
        self
    }

    async fn write(
        &self,
        desired: &File,
        operation: Operation,
        template: MessageTemplate,
    ) -> Result<File, FileError> {
        let key = &desired.key;
        let changes = vec![TreeEntry::blob(&key.path, &desired.contents)];

        self.dispatcher
            .dispatch(key, changes, template, None)
            .await
            .map_err(|cause| FileError::CommitFailed {
                operation,
                path: key.path.clone(),
                cause,
            })?;

        self.observe(key, operation).await
    }

    async fn observe(&self, key: &FileKey, operation: Operation) -> Result<File, FileError> {
        match read_file(self.forge.as_ref(), key).await {
            Ok(contents) => Ok(File::new(key.clone(), contents)),
            Err(ReadError::NotFound) => Err(FileError::NotFound {
                operation,
                path: key.path.clone(),
            }),
            Err(ReadError::Transport(cause)) => Err(transport(operation, key, cause)),
        }
    }
}

fn transport(operation: Operation, key: &FileKey, cause: ForgeError) -> FileError {
    FileError::Transport {
        operation,
        path: key.path.clone(),
        cause,
    }
}

#[async_trait]
impl FileLifecycle for FileReconciler {
    async fn create(&self, desired: &File) -> Result<File, FileError> {
        self.write(desired, Operation::Create, MessageTemplate::Create)
            .await
    }

    async fn read(&self, key: &FileKey) -> Result<File, FileError> {
        self.observe(key, Operation::Read).await
    }

    async fn update(&self, desired: &File) -> Result<File, FileError> {
        self.write(desired, Operation::Update, MessageTemplate::Update)
            .await
    }

    async fn delete(&self, key: &FileKey) -> Result<(), FileError> {
        let op = Operation::Delete;
        let repo = key.repo();

        let repository = self
            .forge
            .get_repository(&repo)
            .await
            .map_err(|e| transport(op, key, e))?;
        if repository.archived {
            tracing::warn!(
                repo = %repository.full_name,
                path = %key.path,
                "repository is archived, skipping file deletion"
            );
            return Ok(());
        }

        match read_file(self.forge.as_ref(), key).await {
            Ok(_) => {}
            Err(ReadError::NotFound) => {
                tracing::debug!(file = %key, "file already absent");
                return Ok(());
            }
            Err(ReadError::Transport(cause)) => return Err(transport(op, key, cause)),
        }

        let head = self
            .forge
            .get_branch_sha(&repo, &key.branch)
            .await
            .map_err(|e| transport(op, key, e))?;
        let commit = self
            .forge
            .get_commit(&repo, &head)
            .await
            .map_err(|e| transport(op, key, e))?;
        let tree = self
            .forge
            .get_tree(&repo, &commit.tree_sha, true)
            .await
            .map_err(|e| transport(op, key, e))?;
        if tree.truncated {
            tracing::warn!(tree = %tree.sha, "recursive tree listing was truncated");
        }

        let mut changes = remove_from_tree(&tree.entries, &key.path);
        changes.push(TreeEntry::deletion(&key.path));

        self.dispatcher
            .dispatch(key, changes, MessageTemplate::Delete, Some(commit.tree_sha))
            .await
            .map_err(|cause| FileError::CommitFailed {
                operation: op,
                path: key.path.clone(),
                cause,
            })?;
        Ok(())
    }

    async fn import(&self, id: &str) -> Result<File, FileError> {
        let key = id::decode(id).map_err(|cause| FileError::Format {
            operation: Operation::Import,
            cause,
        })?;
        self.observe(&key, Operation::Import).await
    }
}

//! resource::reader
//!
//! Fetch a managed file's contents from its branch.

use thiserror::Error;

use crate::core::types::FileKey;
use crate::forge::{Forge, ForgeError};

/// Why a read did not produce contents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    /// The path does not exist on the branch.
    #[error("file not found")]
    NotFound,

    /// Any other failure: network, auth, rate limit, undecodable content.
    #[error(transparent)]
    Transport(ForgeError),
}

impl From<ForgeError> for ReadError {
    fn from(err: ForgeError) -> Self {
        match err {
            ForgeError::NotFound(_) => ReadError::NotFound,
            other => ReadError::Transport(other),
        }
    }
}

/// Read the current contents of `key` from the remote.
pub async fn read_file(forge: &dyn Forge, key: &FileKey) -> Result<String, ReadError> {
    tracing::debug!(file = %key, "reading file");
    let content = forge
        .get_file(&key.repo(), &key.branch, &key.path)
        .await?;
    content.decoded().map_err(ReadError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge};

    fn key() -> FileKey {
        FileKey::new("o", "r", "main", "dir/f.txt")
    }

    #[tokio::test]
    async fn returns_contents() {
        let forge = MockForge::new().with_file("o", "r", "main", "dir/f.txt", "hello\n");
        assert_eq!(read_file(&forge, &key()).await.unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn absent_path_is_not_found() {
        let forge = MockForge::new().with_file("o", "r", "main", "other.txt", "x");
        assert_eq!(read_file(&forge, &key()).await, Err(ReadError::NotFound));
    }

    #[tokio::test]
    async fn absent_branch_is_not_found() {
        let forge = MockForge::new().with_file("o", "r", "dev", "dir/f.txt", "x");
        assert_eq!(read_file(&forge, &key()).await, Err(ReadError::NotFound));
    }

    #[tokio::test]
    async fn other_failures_are_transport() {
        let forge = MockForge::new()
            .with_file("o", "r", "main", "dir/f.txt", "x")
            .fail_on(FailOn::GetFile(ForgeError::RateLimited));
        assert_eq!(
            read_file(&forge, &key()).await,
            Err(ReadError::Transport(ForgeError::RateLimited))
        );
    }

    #[tokio::test]
    async fn directory_is_transport() {
        let forge = MockForge::new().with_file("o", "r", "main", "dir/f.txt/inner", "x");
        assert!(matches!(
            read_file(&forge, &key()).await,
            Err(ReadError::Transport(ForgeError::InvalidResponse(_)))
        ));
    }
}

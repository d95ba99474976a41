//! Integration tests for the file lifecycle.
//!
//! These tests drive `FileReconciler` end to end against `MockForge`, which
//! keeps real trees, commits and refs in memory.

use std::sync::Arc;

use githubfile::commit::{CommitIdentity, CommitSettings, CommitSigner, RetryPolicy, SignError};
use githubfile::core::types::{File, FileKey};
use githubfile::forge::mock::{FailOn, MockForge, MockOperation};
use githubfile::forge::ForgeError;
use githubfile::resource::{FileError, FileLifecycle, FileReconciler, Operation};

// =============================================================================
// Test Fixtures
// =============================================================================

fn settings() -> CommitSettings {
    CommitSettings {
        message_prefix: "[infra]".to_string(),
        identity: CommitIdentity {
            username: "infra-bot".to_string(),
            email: "infra-bot@example.com".to_string(),
        },
        signer: None,
    }
}

fn reconciler(forge: &MockForge) -> FileReconciler {
    FileReconciler::new(Arc::new(forge.clone()), settings())
        .with_retry_policy(RetryPolicy::immediate(3))
}

fn key(path: &str) -> FileKey {
    FileKey::new("acme", "infra", "main", path)
}

fn created_commits(forge: &MockForge) -> Vec<(String, Option<String>)> {
    forge
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            MockOperation::CreateCommit {
                message, signature, ..
            } => Some((message, signature)),
            _ => None,
        })
        .collect()
}

/// Signs every payload with a fixed armored block.
struct StaticSigner;

impl CommitSigner for StaticSigner {
    fn sign(&self, _payload: &str) -> Result<String, SignError> {
        Ok("-----BEGIN PGP SIGNATURE-----\n\nstatic\n-----END PGP SIGNATURE-----\n".to_string())
    }
}

// =============================================================================
// Create / Read / Update
// =============================================================================

mod write_then_read {
    use super::*;

    #[tokio::test]
    async fn create_then_read() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");
        let reconciler = reconciler(&forge);

        let created = reconciler
            .create(&File::new(key("teams/README.md"), "hi"))
            .await
            .unwrap();
        assert_eq!(created.id(), "acme/infra:main:teams/README.md");
        assert_eq!(created.contents, "hi");

        let read = reconciler.read(&key("teams/README.md")).await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn update_then_read() {
        let forge = MockForge::new().with_file("acme", "infra", "main", "f.txt", "hi");
        let reconciler = reconciler(&forge);

        reconciler
            .update(&File::new(key("f.txt"), "bye"))
            .await
            .unwrap();

        let read = reconciler.read(&key("f.txt")).await.unwrap();
        assert_eq!(read.contents, "bye");
    }

    #[tokio::test]
    async fn messages_carry_prefix_and_quoted_path() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");
        let reconciler = reconciler(&forge);

        reconciler
            .create(&File::new(key("f.txt"), "1"))
            .await
            .unwrap();
        reconciler
            .update(&File::new(key("f.txt"), "2"))
            .await
            .unwrap();
        reconciler.delete(&key("f.txt")).await.unwrap();

        let messages: Vec<String> = created_commits(&forge).into_iter().map(|c| c.0).collect();
        assert_eq!(
            messages,
            vec![
                r#"[infra] Create "f.txt"."#,
                r#"[infra] Update "f.txt"."#,
                r#"[infra] Delete "f.txt"."#,
            ]
        );
    }

    #[tokio::test]
    async fn unsigned_without_signer() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");
        reconciler(&forge)
            .create(&File::new(key("f.txt"), "hi"))
            .await
            .unwrap();

        let head = forge.branch_head("acme", "infra", "main").unwrap();
        assert_eq!(forge.commit_signature(&head), None);
    }

    #[tokio::test]
    async fn signed_with_signer() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");
        let settings = CommitSettings {
            signer: Some(Arc::new(StaticSigner)),
            ..settings()
        };
        FileReconciler::new(Arc::new(forge.clone()), settings)
            .create(&File::new(key("f.txt"), "hi"))
            .await
            .unwrap();

        let head = forge.branch_head("acme", "infra", "main").unwrap();
        let signature = forge.commit_signature(&head).unwrap();
        assert!(signature.starts_with("-----BEGIN PGP SIGNATURE-----"));
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");
        let err = reconciler(&forge).read(&key("gone.txt")).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(
            err,
            FileError::NotFound {
                operation: Operation::Read,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn read_transport_failure_is_not_absence() {
        let forge = MockForge::new()
            .with_file("acme", "infra", "main", "f.txt", "hi")
            .fail_on(FailOn::GetFile(ForgeError::RateLimited));

        let err = reconciler(&forge).read(&key("f.txt")).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, FileError::Transport { .. }));
    }
}

// =============================================================================
// Delete
// =============================================================================

mod delete {
    use super::*;

    #[tokio::test]
    async fn removes_file_and_keeps_siblings() {
        let forge = MockForge::new()
            .with_file("acme", "infra", "main", "teams/a.txt", "a")
            .with_file("acme", "infra", "main", "teams/b.txt", "b")
            .with_file("acme", "infra", "main", "README.md", "root");
        let reconciler = reconciler(&forge);

        reconciler.delete(&key("teams/a.txt")).await.unwrap();

        assert_eq!(
            forge.paths("acme", "infra", "main"),
            vec!["README.md", "teams/b.txt"]
        );
        assert!(reconciler
            .read(&key("teams/a.txt"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn archived_repository_commits_nothing() {
        let forge = MockForge::new()
            .with_file("acme", "infra", "main", "f.txt", "hi")
            .archived("acme", "infra");
        let before = forge.branch_head("acme", "infra", "main");

        reconciler(&forge).delete(&key("f.txt")).await.unwrap();

        assert_eq!(forge.branch_head("acme", "infra", "main"), before);
        assert!(!forge.operations().iter().any(MockOperation::is_write));
    }

    #[tokio::test]
    async fn absent_file_commits_nothing() {
        let forge = MockForge::new().with_repository("acme", "infra", "main");

        reconciler(&forge).delete(&key("gone.txt")).await.unwrap();

        assert!(created_commits(&forge).is_empty());
    }

    #[tokio::test]
    async fn second_delete_is_noop() {
        let forge = MockForge::new().with_file("acme", "infra", "main", "f.txt", "hi");
        let reconciler = reconciler(&forge);

        reconciler.delete(&key("f.txt")).await.unwrap();
        let head = forge.branch_head("acme", "infra", "main");
        reconciler.delete(&key("f.txt")).await.unwrap();

        assert_eq!(forge.branch_head("acme", "infra", "main"), head);
    }
}

// =============================================================================
// Import
// =============================================================================

mod import {
    use super::*;

    #[tokio::test]
    async fn existing_file() {
        let forge = MockForge::new().with_file("acme", "infra", "main", "a/b.txt", "hello");

        let file = reconciler(&forge)
            .import("acme/infra:main:a/b.txt")
            .await
            .unwrap();

        assert_eq!(file.key, key("a/b.txt"));
        assert_eq!(file.contents, "hello");
        assert!(!forge.operations().iter().any(MockOperation::is_write));
    }

    #[tokio::test]
    async fn malformed_id() {
        let forge = MockForge::new();
        let err = reconciler(&forge).import("acme:infra").await.unwrap_err();

        assert!(matches!(err, FileError::Format { .. }));
        assert_eq!(
            err.to_string(),
            r#"failed to import: failed to parse "acme:infra" as a file id"#
        );
    }
}

// =============================================================================
// Commit Failures
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let forge = MockForge::new()
            .with_repository("acme", "infra", "main")
            .fail_on_times(
                FailOn::CreateCommit(ForgeError::NetworkError("reset".into())),
                2,
            );

        let file = reconciler(&forge)
            .create(&File::new(key("f.txt"), "hi"))
            .await
            .unwrap();
        assert_eq!(file.contents, "hi");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_commit_failure() {
        let forge = MockForge::new()
            .with_repository("acme", "infra", "main")
            .fail_on(FailOn::CreateTree(ForgeError::ApiError {
                status: 500,
                message: "GitHub server error: boom".into(),
            }));

        let err = reconciler(&forge)
            .create(&File::new(key("f.txt"), "hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FileError::CommitFailed {
                operation: Operation::Create,
                ..
            }
        ));
        assert_eq!(forge.file_contents("acme", "infra", "main", "f.txt"), None);
    }

    #[tokio::test]
    async fn protected_branch_merges_through_pull_request() {
        let forge = MockForge::new()
            .with_repository("acme", "infra", "main")
            .protected("acme", "infra", "main");

        let file = reconciler(&forge)
            .create(&File::new(key("f.txt"), "hi"))
            .await
            .unwrap();

        assert_eq!(file.contents, "hi");
        let pulls = forge.pull_requests();
        assert_eq!(pulls.len(), 1);
        assert!(pulls[0].1, "pull request should be merged");
        assert_eq!(pulls[0].0.base, "main");
        assert_eq!(forge.branches("acme", "infra"), vec!["main"]);
    }
}

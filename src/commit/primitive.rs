//! commit::primitive
//!
//! Build a tree, create a commit and advance a branch, with bounded retry.
//!
//! # Attempt
//!
//! 1. Resolve the branch head.
//! 2. Pick the base tree: the override if given, else the head commit's tree.
//! 3. Create the tree from the base plus the changeset.
//! 4. Sign the canonical commit payload, if a signer is configured.
//! 5. Create the commit with the head as its only parent.
//! 6. Move the branch (`force: false`, so a concurrent push fails the attempt).
//!
//! When branch protection refuses step 6, the commit is pushed to a staging
//! branch, proposed as a pull request against the target branch, merged and
//! the staging branch deleted. Each attempt uses its own staging branch,
//! `<staging_branch>-<attempt>`, so a branch left behind by a failed cleanup
//! never blocks the next attempt.
//!
//! Any failure fails the whole attempt. Attempts are retried blindly up to
//! the policy's limit; a retry starts again from step 1.
//!
//! A base tree override is not re-resolved between attempts. If the branch
//! moves between attempts, the retry commits the overridden tree on top of
//! the new head, dropping whatever the concurrent push changed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use thiserror::Error;

use super::signer::{commit_payload, CommitSigner, SignError};
use crate::core::types::RepoRef;
use crate::forge::{
    CommitAuthor, CreateCommitRequest, CreatePrRequest, CreateTreeRequest, Forge, ForgeError,
    TreeEntry,
};

/// Errors from the commit primitive.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error("failed to sign commit: {0}")]
    Signing(#[from] SignError),

    /// Every attempt failed; `last` is the final attempt's error.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<CommitError> },
}

/// How often and how patiently to attempt a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }
}

/// Author and committer of the commits we create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitIdentity {
    pub username: String,
    pub email: String,
}

/// Everything one commit needs.
#[derive(Clone)]
pub struct CommitOptions {
    pub repo: RepoRef,
    pub branch: String,
    pub message: String,
    pub changes: Vec<TreeEntry>,
    pub identity: CommitIdentity,
    pub signer: Option<Arc<dyn CommitSigner>>,
    /// Tree to build on instead of the head commit's tree.
    pub base_tree_override: Option<String>,
    /// Prefix of the per-attempt staging branches. Must be unique per
    /// invocation.
    pub staging_branch: String,
    pub pull_request_body: Option<String>,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for CommitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitOptions")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("message", &self.message)
            .field("changes", &self.changes.len())
            .field("identity", &self.identity)
            .field("signed", &self.signer.is_some())
            .field("base_tree_override", &self.base_tree_override)
            .field("staging_branch", &self.staging_branch)
            .field("retry", &self.retry)
            .finish()
    }
}

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A staging branch name unique to this process and call.
pub fn staging_branch_name() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("githubfile-{}-{}", nanos, sequence)
}

/// Create a commit on `options.branch` and return its SHA.
///
/// # Errors
///
/// [`CommitError::RetriesExhausted`] wrapping the last attempt's failure.
pub async fn create_commit(
    forge: &dyn Forge,
    options: &CommitOptions,
) -> Result<String, CommitError> {
    let max_attempts = options.retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match attempt_commit(forge, options, attempt).await {
            Ok(sha) => {
                tracing::info!(
                    repo = %options.repo,
                    branch = %options.branch,
                    %sha,
                    "created commit"
                );
                return Ok(sha);
            }
            Err(err) if attempt >= max_attempts => {
                return Err(CommitError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                tracing::warn!(
                    repo = %options.repo,
                    branch = %options.branch,
                    attempt,
                    error = %err,
                    "commit attempt failed, retrying"
                );
                tokio::time::sleep(options.retry.backoff).await;
                attempt += 1;
            }
        }
    }
}

async fn attempt_commit(
    forge: &dyn Forge,
    options: &CommitOptions,
    attempt: u32,
) -> Result<String, CommitError> {
    let repo = &options.repo;

    let head = forge.get_branch_sha(repo, &options.branch).await?;
    let base_tree = match &options.base_tree_override {
        Some(tree) => tree.clone(),
        None => forge.get_commit(repo, &head).await?.tree_sha,
    };
    tracing::debug!(%head, %base_tree, changes = options.changes.len(), "building tree");

    let tree = forge
        .create_tree(
            repo,
            CreateTreeRequest {
                base_tree: Some(base_tree),
                entries: options.changes.clone(),
            },
        )
        .await?;

    let author = CommitAuthor {
        name: options.identity.username.clone(),
        email: options.identity.email.clone(),
        date: Utc::now().trunc_subsecs(0),
    };
    let parents = vec![head];

    let signature = match &options.signer {
        Some(signer) => {
            let payload = commit_payload(&tree, &parents, &author, &options.message);
            Some(sign(Arc::clone(signer), payload).await?)
        }
        None => None,
    };

    let commit = forge
        .create_commit(
            repo,
            CreateCommitRequest {
                message: options.message.clone(),
                tree,
                parents,
                author,
                signature,
            },
        )
        .await?;

    match forge.update_ref(repo, &options.branch, &commit.sha).await {
        Ok(()) => Ok(commit.sha),
        Err(err) if err.is_protected_branch_rejection() => {
            let staging = format!("{}-{}", options.staging_branch, attempt);
            tracing::debug!(
                branch = %options.branch,
                %staging,
                "branch is protected, merging through a pull request"
            );
            merge_through_pull_request(forge, options, &staging, &commit.sha).await?;
            Ok(commit.sha)
        }
        Err(err) => Err(err.into()),
    }
}

/// Signing shells out, so it runs off the async workers.
async fn sign(signer: Arc<dyn CommitSigner>, payload: String) -> Result<String, SignError> {
    tokio::task::spawn_blocking(move || signer.sign(&payload))
        .await
        .map_err(|e| SignError::Task(e.to_string()))?
}

async fn merge_through_pull_request(
    forge: &dyn Forge,
    options: &CommitOptions,
    staging: &str,
    sha: &str,
) -> Result<(), ForgeError> {
    let repo = &options.repo;

    forge.create_ref(repo, staging, sha).await?;

    let merged = async {
        let pr = forge
            .create_pr(
                repo,
                CreatePrRequest {
                    head: staging.to_string(),
                    base: options.branch.clone(),
                    title: options.message.clone(),
                    body: options.pull_request_body.clone(),
                },
            )
            .await?;
        tracing::debug!(number = pr.number, url = %pr.url, "opened pull request");
        forge.merge_pr(repo, pr.number).await
    }
    .await;

    let cleanup = forge.delete_ref(repo, staging).await;
    merged?;
    if let Err(err) = cleanup {
        tracing::warn!(branch = %staging, error = %err, "failed to delete staging branch");
    }
    Ok(())
}

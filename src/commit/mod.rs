//! commit
//!
//! Turning a changeset into a commit on a branch.
//!
//! # Modules
//!
//! - [`primitive`] - Tree, commit and ref updates with bounded retry
//! - [`signer`] - GPG signatures over the commit payload
//!
//! The [`CommitDispatcher`] is what the reconciler talks to: it renders the
//! commit message, fills in identity, signer and a fresh staging branch, and
//! hands the result to the primitive. It never retries on its own.

pub mod primitive;
pub mod signer;

use std::sync::Arc;

pub use primitive::{
    create_commit, staging_branch_name, CommitError, CommitIdentity, CommitOptions, RetryPolicy,
};
pub use signer::{commit_payload, CommitSigner, GpgSigner, SignError};

use crate::core::types::FileKey;
use crate::forge::{Forge, TreeEntry};

/// The action a commit message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTemplate {
    Create,
    Update,
    Delete,
}

impl MessageTemplate {
    fn verb(self) -> &'static str {
        match self {
            MessageTemplate::Create => "Create",
            MessageTemplate::Update => "Update",
            MessageTemplate::Delete => "Delete",
        }
    }

    /// `Create "a/b.txt".`, with the path quoted and escaped.
    pub fn render(self, path: &str) -> String {
        format!("{} {:?}.", self.verb(), path)
    }
}

/// Prepend the configured prefix, if any, to a rendered message.
pub fn format_commit_message(prefix: &str, message: &str) -> String {
    if prefix.is_empty() {
        message.to_string()
    } else {
        format!("{} {}", prefix.trim(), message)
    }
}

/// Commit settings shared by every reconciliation.
#[derive(Clone, Default)]
pub struct CommitSettings {
    pub message_prefix: String,
    pub identity: CommitIdentity,
    pub signer: Option<Arc<dyn CommitSigner>>,
}

impl std::fmt::Debug for CommitSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitSettings")
            .field("message_prefix", &self.message_prefix)
            .field("identity", &self.identity)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

/// Builds commit options for a file and delegates to the primitive.
#[derive(Clone)]
pub struct CommitDispatcher {
    forge: Arc<dyn Forge>,
    settings: CommitSettings,
    retry: RetryPolicy,
}

impl CommitDispatcher {
    pub fn new(forge: Arc<dyn Forge>, settings: CommitSettings) -> Self {
        Self {
            forge,
            settings,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy. Tests use this to skip the backoff.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The options a dispatch for `key` would use.
    pub fn options(
        &self,
        key: &FileKey,
        changes: Vec<TreeEntry>,
        template: MessageTemplate,
        base_tree_override: Option<String>,
    ) -> CommitOptions {
        CommitOptions {
            repo: key.repo(),
            branch: key.branch.clone(),
            message: format_commit_message(
                &self.settings.message_prefix,
                &template.render(&key.path),
            ),
            changes,
            identity: self.settings.identity.clone(),
            signer: self.settings.signer.clone(),
            base_tree_override,
            staging_branch: staging_branch_name(),
            pull_request_body: None,
            retry: self.retry,
        }
    }

    /// Commit `changes` to the file's branch; returns the new commit SHA.
    pub async fn dispatch(
        &self,
        key: &FileKey,
        changes: Vec<TreeEntry>,
        template: MessageTemplate,
        base_tree_override: Option<String>,
    ) -> Result<String, CommitError> {
        let options = self.options(key, changes, template, base_tree_override);
        tracing::debug!(file = %key, message = %options.message, "dispatching commit");
        create_commit(self.forge.as_ref(), &options).await
    }
}

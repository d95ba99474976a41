//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps a tiny git object store in memory: repositories with
//! branches, commits, flat trees and blobs. It honours the parts of the
//! GitHub API contract the reconciler depends on (base trees, `sha: null`
//! deletions, fast-forward-only ref updates, protected branches, archived
//! repositories) and allows configuring failure scenarios.
//!
//! # Example
//!
//! ```
//! use githubfile::core::types::RepoRef;
//! use githubfile::forge::mock::MockForge;
//! use githubfile::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_file("o", "r", "main", "docs/a.md", "hello");
//!
//! let file = forge
//!     .get_file(&RepoRef::new("o", "r"), "main", "docs/a.md")
//!     .await
//!     .unwrap();
//! assert_eq!(file.decoded().unwrap(), "hello");
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::traits::{
    CommitAuthor, CreateCommitRequest, CreatePrRequest, CreateTreeRequest, EntryKind,
    EntrySource, FileContent, Forge, ForgeError, GitCommit, PullRequest, Repository,
    Tree, TreeEntry,
};
use crate::core::types::RepoRef;

/// Mode reported for synthesised directory entries.
const DIRECTORY_MODE: &str = "040000";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Repositories by `owner/name`.
    repos: HashMap<String, MockRepo>,
    /// Commits by SHA.
    commits: HashMap<String, GitCommit>,
    /// Signatures of signed commits by SHA.
    signatures: HashMap<String, String>,
    /// Trees by SHA, stored flat: full path to entry.
    trees: HashMap<String, FlatTree>,
    /// Blob contents by SHA.
    blobs: HashMap<String, String>,
    /// Pull requests by number.
    pulls: BTreeMap<u64, MockPull>,
    /// Counter mixed into commit SHAs so identical commits stay distinct.
    next_commit: u64,
    /// Methods to fail on (for testing error paths).
    fail_on: Vec<(FailOn, Option<usize>)>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Default)]
struct MockRepo {
    archived: bool,
    /// Branch name to head commit SHA.
    branches: HashMap<String, String>,
    protected: HashSet<String>,
}

#[derive(Debug, Clone)]
struct MockPull {
    repo: String,
    pr: PullRequest,
    merged: bool,
}

type FlatTree = BTreeMap<String, MockEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MockEntry {
    mode: String,
    kind: EntryKind,
    sha: String,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRepository(ForgeError),
    GetFile(ForgeError),
    GetBranchSha(ForgeError),
    GetCommit(ForgeError),
    GetTree(ForgeError),
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
    CreateRef(ForgeError),
    DeleteRef(ForgeError),
    CreatePr(ForgeError),
    MergePr(ForgeError),
}

impl FailOn {
    fn method(&self) -> &'static str {
        match self {
            FailOn::GetRepository(_) => "get_repository",
            FailOn::GetFile(_) => "get_file",
            FailOn::GetBranchSha(_) => "get_branch_sha",
            FailOn::GetCommit(_) => "get_commit",
            FailOn::GetTree(_) => "get_tree",
            FailOn::CreateTree(_) => "create_tree",
            FailOn::CreateCommit(_) => "create_commit",
            FailOn::UpdateRef(_) => "update_ref",
            FailOn::CreateRef(_) => "create_ref",
            FailOn::DeleteRef(_) => "delete_ref",
            FailOn::CreatePr(_) => "create_pr",
            FailOn::MergePr(_) => "merge_pr",
        }
    }

    fn error(&self) -> ForgeError {
        match self {
            FailOn::GetRepository(e)
            | FailOn::GetFile(e)
            | FailOn::GetBranchSha(e)
            | FailOn::GetCommit(e)
            | FailOn::GetTree(e)
            | FailOn::CreateTree(e)
            | FailOn::CreateCommit(e)
            | FailOn::UpdateRef(e)
            | FailOn::CreateRef(e)
            | FailOn::DeleteRef(e)
            | FailOn::CreatePr(e)
            | FailOn::MergePr(e) => e.clone(),
        }
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRepository {
        repo: String,
    },
    GetFile {
        branch: String,
        path: String,
    },
    GetBranchSha {
        branch: String,
    },
    GetCommit {
        sha: String,
    },
    GetTree {
        sha: String,
        recursive: bool,
    },
    CreateTree {
        base_tree: Option<String>,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        message: String,
        tree: String,
        parents: Vec<String>,
        author: CommitAuthor,
        signature: Option<String>,
    },
    UpdateRef {
        branch: String,
        sha: String,
    },
    CreateRef {
        branch: String,
        sha: String,
    },
    DeleteRef {
        branch: String,
    },
    CreatePr {
        head: String,
        base: String,
        title: String,
    },
    MergePr {
        number: u64,
    },
}

impl MockOperation {
    /// Whether this operation writes to the remote.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
                | MockOperation::CreateRef { .. }
                | MockOperation::DeleteRef { .. }
                | MockOperation::CreatePr { .. }
                | MockOperation::MergePr { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Add a repository whose `branch` points at an empty commit.
    pub fn with_repository(self, owner: &str, name: &str, branch: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.ensure_branch(&repo_key(owner, name), branch);
        }
        self
    }

    /// Commit `contents` at `path` on `branch`, creating the repository and
    /// branch as needed.
    pub fn with_file(
        self,
        owner: &str,
        name: &str,
        branch: &str,
        path: &str,
        contents: &str,
    ) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let key = repo_key(owner, name);
            let head = inner.ensure_branch(&key, branch);
            let mut tree = inner.tree_of_commit(&head);
            let sha = inner.store_blob(contents);
            tree.insert(
                path.to_string(),
                MockEntry {
                    mode: super::traits::REGULAR_FILE_MODE.to_string(),
                    kind: EntryKind::Blob,
                    sha,
                },
            );
            let tree_sha = inner.store_tree(tree);
            let commit = inner.store_commit(&tree_sha, vec![head], &format!("Add {}", path));
            inner.set_branch(&key, branch, commit);
        }
        self
    }

    /// Mark a repository as archived. Every write to it is rejected.
    pub fn archived(self, owner: &str, name: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.repos.entry(repo_key(owner, name)).or_default().archived = true;
        }
        self
    }

    /// Protect a branch: direct ref updates are rejected, merges are allowed.
    pub fn protected(self, owner: &str, name: &str, branch: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner
                .repos
                .entry(repo_key(owner, name))
                .or_default()
                .protected
                .insert(branch.to_string());
        }
        self
    }

    /// Configure the mock to fail every call to a method.
    ///
    /// # Example
    ///
    /// ```
    /// use githubfile::forge::mock::{MockForge, FailOn};
    /// use githubfile::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::UpdateRef(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on.push((fail_on, None));
        }
        self
    }

    /// Configure the mock to fail the next `times` calls to a method.
    pub fn fail_on_times(self, fail_on: FailOn, times: usize) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on.push((fail_on, Some(times)));
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on.clear();
    }

    /// Get all recorded operations.
    ///
    /// Useful for verifying the mock was called correctly.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Contents of a file at the head of a branch (for test verification).
    pub fn file_contents(&self, owner: &str, name: &str, branch: &str, path: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let head = inner.repos.get(&repo_key(owner, name))?.branches.get(branch)?;
        let entry = inner.tree_of_commit(head).get(path)?.clone();
        inner.blobs.get(&entry.sha).cloned()
    }

    /// All file paths at the head of a branch.
    pub fn paths(&self, owner: &str, name: &str, branch: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .repos
            .get(&repo_key(owner, name))
            .and_then(|repo| repo.branches.get(branch))
            .map(|head| inner.tree_of_commit(head).keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Head commit SHA of a branch.
    pub fn branch_head(&self, owner: &str, name: &str, branch: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .repos
            .get(&repo_key(owner, name))?
            .branches
            .get(branch)
            .cloned()
    }

    /// Names of all branches in a repository, sorted.
    pub fn branches(&self, owner: &str, name: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut branches: Vec<String> = inner
            .repos
            .get(&repo_key(owner, name))
            .map(|repo| repo.branches.keys().cloned().collect())
            .unwrap_or_default();
        branches.sort();
        branches
    }

    /// Get a commit by SHA.
    pub fn commit(&self, sha: &str) -> Option<GitCommit> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(sha).cloned()
    }

    /// Signature a commit was created with, if any.
    pub fn commit_signature(&self, sha: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.signatures.get(sha).cloned()
    }

    /// All pull requests with their merged flag.
    pub fn pull_requests(&self) -> Vec<(PullRequest, bool)> {
        let inner = self.inner.lock().unwrap();
        inner
            .pulls
            .values()
            .map(|pull| (pull.pr.clone(), pull.merged))
            .collect()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, method: &str) -> Result<(), ForgeError> {
        let mut inner = self.inner.lock().unwrap();
        for (fail_on, remaining) in inner.fail_on.iter_mut() {
            if fail_on.method() != method {
                continue;
            }
            match remaining {
                None => return Err(fail_on.error()),
                Some(0) => continue,
                Some(n) => {
                    *n -= 1;
                    return Err(fail_on.error());
                }
            }
        }
        Ok(())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

fn repo_key(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name)
}

/// SHA-1-length hex digest of a typed payload.
fn object_sha(kind: &str, payload: &str) -> String {
    let digest = Sha256::digest(format!("{}\0{}", kind, payload).as_bytes());
    hex::encode(digest)[..40].to_string()
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockForgeInner {
    fn repo(&self, repo: &RepoRef) -> Result<&MockRepo, ForgeError> {
        self.repos
            .get(&repo.to_string())
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))
    }

    fn writable_repo(&mut self, repo: &RepoRef) -> Result<&mut MockRepo, ForgeError> {
        let found = self
            .repos
            .get_mut(&repo.to_string())
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))?;
        if found.archived {
            return Err(ForgeError::AuthFailed(
                "Permission denied: Repository was archived so is read-only.".into(),
            ));
        }
        Ok(found)
    }

    fn branch_head(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        self.repo(repo)?
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))
    }

    /// Create the repository and branch if missing; return the branch head.
    fn ensure_branch(&mut self, key: &str, branch: &str) -> String {
        if let Some(head) = self.repos.get(key).and_then(|r| r.branches.get(branch)) {
            return head.clone();
        }
        let tree = self.store_tree(FlatTree::new());
        let commit = self.store_commit(&tree, vec![], "Initial commit");
        let repo = self.repos.entry(key.to_string()).or_default();
        repo.branches.insert(branch.to_string(), commit.clone());
        commit
    }

    fn set_branch(&mut self, key: &str, branch: &str, sha: String) {
        self.repos
            .entry(key.to_string())
            .or_default()
            .branches
            .insert(branch.to_string(), sha);
    }

    fn tree_of_commit(&self, sha: &str) -> FlatTree {
        self.commits
            .get(sha)
            .and_then(|commit| self.trees.get(&commit.tree_sha))
            .cloned()
            .unwrap_or_default()
    }

    fn store_blob(&mut self, contents: &str) -> String {
        let sha = object_sha("blob", contents);
        self.blobs.insert(sha.clone(), contents.to_string());
        sha
    }

    fn store_tree(&mut self, tree: FlatTree) -> String {
        let listing: String = tree
            .iter()
            .map(|(path, e)| format!("{} {} {} {}\n", e.mode, e.kind, e.sha, path))
            .collect();
        let sha = object_sha("tree", &listing);
        self.trees.insert(sha.clone(), tree);
        sha
    }

    fn store_commit(&mut self, tree: &str, parents: Vec<String>, message: &str) -> String {
        self.next_commit += 1;
        let payload = format!(
            "{}\n{}\n{}\n{}",
            tree,
            parents.join(" "),
            message,
            self.next_commit
        );
        let sha = object_sha("commit", &payload);
        self.commits.insert(
            sha.clone(),
            GitCommit {
                sha: sha.clone(),
                tree_sha: tree.to_string(),
                parents,
                message: message.to_string(),
            },
        );
        sha
    }

    /// Whether `ancestor` is reachable from `sha` through parent links.
    fn is_ancestor(&self, ancestor: &str, sha: &str) -> bool {
        let mut pending = vec![sha.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&current) {
                pending.extend(commit.parents.iter().cloned());
            }
        }
        false
    }

    /// Expand a flat tree into a listing, synthesising directory entries.
    fn listing(&self, tree_sha: &str, flat: &FlatTree, recursive: bool) -> Vec<TreeEntry> {
        let mut directories = BTreeSet::new();
        let mut files = Vec::new();
        for (path, entry) in flat {
            let parts: Vec<&str> = path.split('/').collect();
            for depth in 1..parts.len() {
                directories.insert(parts[..depth].join("/"));
            }
            if recursive || parts.len() == 1 {
                files.push(TreeEntry {
                    path: path.clone(),
                    mode: entry.mode.clone(),
                    kind: entry.kind,
                    source: EntrySource::Sha(entry.sha.clone()),
                });
            }
        }

        let mut entries: Vec<TreeEntry> = directories
            .into_iter()
            .filter(|dir| recursive || !dir.contains('/'))
            .map(|dir| TreeEntry {
                source: EntrySource::Sha(object_sha("tree", &format!("{}:{}", tree_sha, dir))),
                path: dir,
                mode: DIRECTORY_MODE.to_string(),
                kind: EntryKind::Tree,
            })
            .collect();
        entries.extend(files);
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, ForgeError> {
        self.record(MockOperation::GetRepository {
            repo: repo.to_string(),
        });
        self.check_fail("get_repository")?;

        let inner = self.inner.lock().unwrap();
        let found = inner.repo(repo)?;
        Ok(Repository {
            full_name: repo.to_string(),
            archived: found.archived,
        })
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> Result<FileContent, ForgeError> {
        self.record(MockOperation::GetFile {
            branch: branch.to_string(),
            path: path.to_string(),
        });
        self.check_fail("get_file")?;

        let inner = self.inner.lock().unwrap();
        let head = inner
            .branch_head(repo, branch)
            .map_err(|_| ForgeError::NotFound(format!("No commit found for the ref {}", branch)))?;
        let tree = inner.tree_of_commit(&head);

        let Some(entry) = tree.get(path) else {
            let prefix = format!("{}/", path);
            if tree.keys().any(|p| p.starts_with(&prefix)) {
                return Err(ForgeError::InvalidResponse(format!(
                    "{:?} is a directory, not a file",
                    path
                )));
            }
            return Err(ForgeError::NotFound("Not Found".into()));
        };

        if entry.kind != EntryKind::Blob {
            return Err(ForgeError::InvalidResponse(format!(
                "{:?} is a {}, not a file",
                path, entry.kind
            )));
        }
        let contents = inner.blobs.get(&entry.sha).ok_or_else(|| {
            ForgeError::InvalidResponse(format!("blob {} has no contents", entry.sha))
        })?;
        Ok(FileContent::from_text(path, &entry.sha, contents))
    }

    async fn get_branch_sha(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        self.record(MockOperation::GetBranchSha {
            branch: branch.to_string(),
        });
        self.check_fail("get_branch_sha")?;

        let inner = self.inner.lock().unwrap();
        inner.branch_head(repo, branch)
    }

    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<GitCommit, ForgeError> {
        self.record(MockOperation::GetCommit {
            sha: sha.to_string(),
        });
        self.check_fail("get_commit")?;

        let inner = self.inner.lock().unwrap();
        inner.repo(repo)?;
        inner
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))
    }

    async fn get_tree(
        &self,
        repo: &RepoRef,
        sha: &str,
        recursive: bool,
    ) -> Result<Tree, ForgeError> {
        self.record(MockOperation::GetTree {
            sha: sha.to_string(),
            recursive,
        });
        self.check_fail("get_tree")?;

        let inner = self.inner.lock().unwrap();
        inner.repo(repo)?;
        let flat = inner
            .trees
            .get(sha)
            .ok_or_else(|| ForgeError::NotFound("Not Found".into()))?;
        Ok(Tree {
            sha: sha.to_string(),
            entries: inner.listing(sha, flat, recursive),
            truncated: false,
        })
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: request.base_tree.clone(),
            entries: request.entries.clone(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.inner.lock().unwrap();
        inner.writable_repo(repo)?;

        let mut tree = match &request.base_tree {
            Some(base) => inner
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| unprocessable(format!("base_tree {} not found", base)))?,
            None => FlatTree::new(),
        };

        for entry in request.entries {
            if entry.kind == EntryKind::Tree {
                return Err(unprocessable(format!(
                    "tree entry {:?} must reference files, not directories",
                    entry.path
                )));
            }
            match entry.source {
                EntrySource::Delete => {
                    tree.remove(&entry.path);
                }
                EntrySource::Content(contents) => {
                    let sha = inner.store_blob(&contents);
                    tree.insert(
                        entry.path,
                        MockEntry {
                            mode: entry.mode,
                            kind: entry.kind,
                            sha,
                        },
                    );
                }
                EntrySource::Sha(sha) => {
                    if entry.kind == EntryKind::Blob && !inner.blobs.contains_key(&sha) {
                        return Err(unprocessable(format!("{} is not a valid blob", sha)));
                    }
                    tree.insert(
                        entry.path,
                        MockEntry {
                            mode: entry.mode,
                            kind: entry.kind,
                            sha,
                        },
                    );
                }
            }
        }

        Ok(inner.store_tree(tree))
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        request: CreateCommitRequest,
    ) -> Result<GitCommit, ForgeError> {
        self.record(MockOperation::CreateCommit {
            message: request.message.clone(),
            tree: request.tree.clone(),
            parents: request.parents.clone(),
            author: request.author.clone(),
            signature: request.signature.clone(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.inner.lock().unwrap();
        inner.writable_repo(repo)?;
        if !inner.trees.contains_key(&request.tree) {
            return Err(unprocessable(format!("tree {} not found", request.tree)));
        }
        if let Some(parent) = request
            .parents
            .iter()
            .find(|p| !inner.commits.contains_key(*p))
        {
            return Err(unprocessable(format!("parent {} not found", parent)));
        }

        let sha = inner.store_commit(&request.tree, request.parents, &request.message);
        if let Some(signature) = request.signature {
            inner.signatures.insert(sha.clone(), signature);
        }
        Ok(inner.commits[&sha].clone())
    }

    async fn update_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        self.check_fail("update_ref")?;

        let mut inner = self.inner.lock().unwrap();
        let found = inner.writable_repo(repo)?;
        if found.protected.contains(branch) {
            return Err(unprocessable(format!(
                "Protected branch update failed for refs/heads/{}.",
                branch
            )));
        }
        let current = found
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist"))?;
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist"));
        }
        if !inner.is_ancestor(&current, sha) {
            return Err(unprocessable("Update is not a fast forward"));
        }
        inner.set_branch(&repo.to_string(), branch, sha.to_string());
        Ok(())
    }

    async fn create_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::CreateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        self.check_fail("create_ref")?;

        let mut inner = self.inner.lock().unwrap();
        let exists = inner.writable_repo(repo)?.branches.contains_key(branch);
        if exists {
            return Err(unprocessable("Reference already exists"));
        }
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist"));
        }
        inner.set_branch(&repo.to_string(), branch, sha.to_string());
        Ok(())
    }

    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError> {
        self.record(MockOperation::DeleteRef {
            branch: branch.to_string(),
        });
        self.check_fail("delete_ref")?;

        let mut inner = self.inner.lock().unwrap();
        inner
            .writable_repo(repo)?
            .branches
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| unprocessable("Reference does not exist"))
    }

    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.inner.lock().unwrap();
        let found = inner.writable_repo(repo)?;
        for branch in [&request.head, &request.base] {
            if !found.branches.contains_key(branch) {
                return Err(unprocessable(format!("branch {} does not exist", branch)));
            }
        }

        let number = inner.pulls.keys().next_back().copied().unwrap_or(0) + 1;
        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/pull/{}", repo, number),
            head: request.head,
            base: request.base,
        };
        inner.pulls.insert(
            number,
            MockPull {
                repo: repo.to_string(),
                pr: pr.clone(),
                merged: false,
            },
        );
        Ok(pr)
    }

    async fn merge_pr(&self, repo: &RepoRef, number: u64) -> Result<(), ForgeError> {
        self.record(MockOperation::MergePr { number });
        self.check_fail("merge_pr")?;

        let mut inner = self.inner.lock().unwrap();
        inner.writable_repo(repo)?;
        let pull = inner
            .pulls
            .get(&number)
            .filter(|pull| pull.repo == repo.to_string())
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))?;
        if pull.merged {
            return Err(ForgeError::ApiError {
                status: 405,
                message: "Pull Request is not mergeable".into(),
            });
        }

        let base = inner.branch_head(repo, &pull.pr.base)?;
        let head = inner.branch_head(repo, &pull.pr.head)?;
        let tree = inner.commits[&head].tree_sha.clone();
        let message = format!("Merge pull request #{} from {}", number, pull.pr.head);
        let merge = inner.store_commit(&tree, vec![base, head], &message);
        inner.set_branch(&repo.to_string(), &pull.pr.base, merge);
        if let Some(pull) = inner.pulls.get_mut(&number) {
            pull.merged = true;
        }
        Ok(())
    }
}

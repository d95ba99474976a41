//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! Reads go through the contents endpoint. Writes go through the git data
//! endpoints (trees, commits, refs) so that one commit can carry a signed,
//! multi-entry change. Pull request endpoints are only used when branch
//! protection refuses a direct ref update.
//!
//! # Authentication
//!
//! A static token is sent as a bearer token on every request. The token
//! never appears in `Debug` output.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `ForgeError::RateLimited` and leaves retrying to the commit primitive.
//!
//! # Example
//!
//! ```ignore
//! use githubfile::core::types::RepoRef;
//! use githubfile::forge::{Forge, GitHubForge};
//!
//! let forge = GitHubForge::new("ghp_xxx");
//! let repo = forge.get_repository(&RepoRef::new("octocat", "hello-world")).await?;
//! println!("archived: {}", repo.archived);
//! ```

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    CommitAuthor, CreateCommitRequest, CreatePrRequest, CreateTreeRequest, EntryKind,
    EntrySource, FileContent, Forge, ForgeError, GitCommit, PullRequest, Repository,
    Tree, TreeEntry,
};
use crate::core::types::RepoRef;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "githubfile";

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token or GitHub App token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a forge talking to `api.github.com`.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`)
    /// or for pointing tests at a local mock server.
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    ///
    /// Each segment may itself contain `/` (file paths, branch names); the
    /// pieces between slashes are percent-encoded individually.
    fn repo_url(&self, repo: &RepoRef, segments: &[&str]) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ForgeError::NetworkError(format!("invalid API base {:?}: {}", self.api_base, e))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ForgeError::NetworkError(format!("invalid API base {:?}", self.api_base))
            })?;
            path.pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str()]);
            for segment in segments {
                path.extend(segment.split('/'));
            }
        }
        Ok(url)
    }

    /// Send a request and decode a JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&(dyn erased::JsonBody + Sync)>,
    ) -> Result<T, ForgeError> {
        let response = self.execute(method, url, body).await?;
        self.handle_response(response).await
    }

    /// Send a request whose response body is ignored.
    async fn send_no_content(
        &self,
        method: Method,
        url: Url,
        body: Option<&(dyn erased::JsonBody + Sync)>,
    ) -> Result<(), ForgeError> {
        let response = self.execute(method, url, body).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response, status).await
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&(dyn erased::JsonBody + Sync)>,
    ) -> Result<Response, ForgeError> {
        tracing::debug!(%method, %url, "github request");
        let mut request = self.client.request(method, url).headers(self.headers()?);
        if let Some(body) = body {
            request = request.json(&body.to_json()?);
        }
        request
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                ForgeError::InvalidResponse(format!("failed to parse response: {}", e))
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // GitHub Apps use X-Accepted-GitHub-Permissions, classic OAuth uses X-Accepted-OAuth-Scopes.
        let headers = response.headers();
        let required_permissions = headers
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let required_scopes = headers
            .get("X-Accepted-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let rate_limit_exhausted = headers
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);

                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                } else if let Some(scopes) = required_scopes.filter(|s| !s.is_empty()) {
                    err_msg.push_str(&format!(" [required scopes: {}]", scopes));
                }

                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for GitHubForge {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, ForgeError> {
        let url = self.repo_url(repo, &[])?;
        let repository: GitHubRepository = self.send(Method::GET, url, None).await?;
        Ok(repository.into())
    }

    async fn get_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> Result<FileContent, ForgeError> {
        let mut url = self.repo_url(repo, &["contents", path])?;
        url.query_pairs_mut().append_pair("ref", branch);

        match self.send(Method::GET, url, None).await? {
            GitHubContents::File(content) if content.kind == "file" => Ok(FileContent {
                path: content.path,
                sha: content.sha,
                encoding: content.encoding.unwrap_or_default(),
                content: content.content.unwrap_or_default(),
            }),
            GitHubContents::File(content) => Err(ForgeError::InvalidResponse(format!(
                "{:?} is a {}, not a file",
                path, content.kind
            ))),
            GitHubContents::Directory(_) => Err(ForgeError::InvalidResponse(format!(
                "{:?} is a directory, not a file",
                path
            ))),
        }
    }

    async fn get_branch_sha(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &["git", "ref", "heads", branch])?;
        let reference: GitHubReference = self.send(Method::GET, url, None).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<GitCommit, ForgeError> {
        let url = self.repo_url(repo, &["git", "commits", sha])?;
        let commit: GitHubCommit = self.send(Method::GET, url, None).await?;
        Ok(commit.into())
    }

    async fn get_tree(
        &self,
        repo: &RepoRef,
        sha: &str,
        recursive: bool,
    ) -> Result<Tree, ForgeError> {
        let mut url = self.repo_url(repo, &["git", "trees", sha])?;
        if recursive {
            url.query_pairs_mut().append_pair("recursive", "1");
        }
        let tree: GitHubTree = self.send(Method::GET, url, None).await?;
        tree.try_into()
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        request: CreateTreeRequest,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &["git", "trees"])?;
        let body = CreateTreeBody {
            base_tree: request.base_tree.as_deref(),
            tree: request.entries.iter().map(TreeEntryBody::from).collect(),
        };
        let created: GitHubSha = self.send(Method::POST, url, Some(&body)).await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        request: CreateCommitRequest,
    ) -> Result<GitCommit, ForgeError> {
        let url = self.repo_url(repo, &["git", "commits"])?;
        let author = AuthorBody::from(&request.author);
        let body = CreateCommitBody {
            message: &request.message,
            tree: &request.tree,
            parents: &request.parents,
            author: author.clone(),
            committer: author,
            signature: request.signature.as_deref(),
        };
        let commit: GitHubCommit = self.send(Method::POST, url, Some(&body)).await?;
        Ok(commit.into())
    }

    async fn update_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &["git", "refs", "heads", branch])?;
        let body = UpdateRefBody { sha, force: false };
        self.send_no_content(Method::PATCH, url, Some(&body)).await
    }

    async fn create_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &["git", "refs"])?;
        let body = CreateRefBody {
            reference: format!("refs/heads/{}", branch),
            sha,
        };
        self.send_no_content(Method::POST, url, Some(&body)).await
    }

    async fn delete_ref(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &["git", "refs", "heads", branch])?;
        self.send_no_content(Method::DELETE, url, None).await
    }

    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, &["pulls"])?;
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
        };
        let pr: GitHubPullRequest = self.send(Method::POST, url, Some(&body)).await?;
        Ok(pr.into())
    }

    async fn merge_pr(&self, repo: &RepoRef, number: u64) -> Result<(), ForgeError> {
        let number = number.to_string();
        let url = self.repo_url(repo, &["pulls", &number, "merge"])?;
        let body = MergePrBody {
            merge_method: "merge",
        };
        self.send_no_content(Method::PUT, url, Some(&body)).await
    }
}

/// Object-safe JSON request bodies, so `send` is not generic over the body.
mod erased {
    use super::ForgeError;

    pub trait JsonBody {
        fn to_json(&self) -> Result<serde_json::Value, ForgeError>;
    }

    impl<T: serde::Serialize> JsonBody for T {
        fn to_json(&self) -> Result<serde_json::Value, ForgeError> {
            serde_json::to_value(self).map_err(|e| {
                ForgeError::InvalidResponse(format!("failed to encode request: {}", e))
            })
        }
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<TreeEntryBody<'a>>,
}

/// One entry of a create-tree request.
///
/// `sha` is tri-state: omitted for inline content, `null` to delete the
/// path, a string to reference an existing object.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<Option<&'a str>>,
}

impl<'a> From<&'a TreeEntry> for TreeEntryBody<'a> {
    fn from(entry: &'a TreeEntry) -> Self {
        let (content, sha) = match &entry.source {
            EntrySource::Content(content) => (Some(content.as_str()), None),
            EntrySource::Sha(sha) => (None, Some(Some(sha.as_str()))),
            EntrySource::Delete => (None, Some(None)),
        };
        Self {
            path: &entry.path,
            mode: &entry.mode,
            kind: entry.kind.as_str(),
            content,
            sha,
        }
    }
}

/// Author/committer block of a create-commit request.
#[derive(Serialize, Clone)]
struct AuthorBody<'a> {
    name: &'a str,
    email: &'a str,
    date: String,
}

impl<'a> From<&'a CommitAuthor> for AuthorBody<'a> {
    fn from(author: &'a CommitAuthor) -> Self {
        Self {
            name: &author.name,
            email: &author.email,
            date: author.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
    author: AuthorBody<'a>,
    committer: AuthorBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Request body for merging a PR.
#[derive(Serialize)]
struct MergePrBody {
    merge_method: &'static str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Repository response format.
#[derive(Deserialize)]
struct GitHubRepository {
    full_name: String,
    #[serde(default)]
    archived: bool,
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        Repository {
            full_name: repo.full_name,
            archived: repo.archived,
        }
    }
}

/// The contents endpoint answers with an object for files and an array for
/// directories.
#[derive(Deserialize)]
#[serde(untagged)]
enum GitHubContents {
    File(GitHubContent),
    Directory(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
struct GitHubContent {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    sha: String,
    encoding: Option<String>,
    content: Option<String>,
}

/// Any response that only needs its `sha`.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubReference {
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
    #[serde(default)]
    parents: Vec<GitHubSha>,
    #[serde(default)]
    message: String,
}

impl From<GitHubCommit> for GitCommit {
    fn from(commit: GitHubCommit) -> Self {
        GitCommit {
            sha: commit.sha,
            tree_sha: commit.tree.sha,
            parents: commit.parents.into_iter().map(|p| p.sha).collect(),
            message: commit.message,
        }
    }
}

#[derive(Deserialize)]
struct GitHubTree {
    sha: String,
    tree: Vec<GitHubTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct GitHubTreeEntry {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

impl TryFrom<GitHubTree> for Tree {
    type Error = ForgeError;

    fn try_from(tree: GitHubTree) -> Result<Self, Self::Error> {
        let entries = tree
            .tree
            .into_iter()
            .map(|entry| {
                let kind = EntryKind::parse(&entry.kind).ok_or_else(|| {
                    ForgeError::InvalidResponse(format!(
                        "unknown tree entry type {:?} for {:?}",
                        entry.kind, entry.path
                    ))
                })?;
                Ok(TreeEntry {
                    path: entry.path,
                    mode: entry.mode,
                    kind,
                    source: EntrySource::Sha(entry.sha),
                })
            })
            .collect::<Result<Vec<_>, ForgeError>>()?;

        Ok(Tree {
            sha: tree.sha,
            entries,
            truncated: tree.truncated,
        })
    }
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    head: GitHubRef,
    base: GitHubRef,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
        }
    }
}

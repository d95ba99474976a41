//! forge
//!
//! Abstraction for the remote repository host.
//!
//! # Architecture
//!
//! The `Forge` trait is the only way the reconciler talks to GitHub. Each
//! method maps to one REST endpoint, so the reconciler's control flow stays
//! visible in one place and the mock can replay it deterministically.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use githubfile::core::types::RepoRef;
//! use githubfile::forge::{Forge, GitHubForge};
//!
//! let forge = GitHubForge::new(token);
//! let head = forge.get_branch_sha(&RepoRef::new("o", "r"), "main").await?;
//! println!("main is at {}", head);
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use github::GitHubForge;
pub use traits::*;

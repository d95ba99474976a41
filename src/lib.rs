//! githubfile - Manage single files in GitHub repositories
//!
//! githubfile reconciles one file at a time: given an owner, repository,
//! branch and path, it creates, reads, updates, deletes or imports that file
//! through the Git data API, with optional GPG-signed commits and a pull
//! request fallback for protected branches.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, prints JSON)
//! - [`resource`] - The file lifecycle: create, read, update, delete, import
//! - [`commit`] - Commit construction, signing, retries and the protected branch fallback
//! - [`forge`] - The GitHub API behind the [`forge::Forge`] trait, plus an in-memory mock
//! - [`core`] - File keys, the id codec and configuration
//!
//! # Invariants
//!
//! 1. Every write is exactly one commit on the target branch
//! 2. Branch refs only ever move forward
//! 3. Deleting an absent file, or any file in an archived repository, commits nothing

pub mod cli;
pub mod commit;
pub mod core;
pub mod forge;
pub mod resource;

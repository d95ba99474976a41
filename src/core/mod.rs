//! core
//!
//! Domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - `FileKey`, `File` and `RepoRef`
//! - [`id`] - The `<owner>/<repo>:<branch>:<path>` identifier
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod id;
pub mod types;

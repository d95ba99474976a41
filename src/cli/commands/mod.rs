//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Turns its arguments into a `File`, `FileKey` or id
//! 2. Calls the [`crate::resource::FileLifecycle`] to reconcile it
//! 3. Prints the observed file to stdout as JSON
//!
//! Lifecycle commands are async because they talk to GitHub. Each handler
//! builds a tokio runtime and blocks on its async body. `id` and
//! `completion` run offline and never load the config.

mod completion;
mod create;
mod delete;
mod id;
mod import;
mod read;
mod update;

pub use completion::completion;
pub use create::create;
pub use delete::delete;
pub use id::{decode_id, encode_id};
pub use import::import;
pub use read::read;
pub use update::update;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::args::{Command, FileArgs, IdAction, KeyArgs};
use crate::core::config::Config;
use crate::core::types::{File, FileKey};
use crate::resource::FileReconciler;

/// Execution context shared by all handlers.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file from `--config`
    pub config_path: Option<PathBuf>,
    /// Suppress human-readable status lines on stderr
    pub quiet: bool,
}

impl Context {
    /// Load the config and build a reconciler against GitHub.
    pub fn reconciler(&self) -> Result<FileReconciler> {
        let config = Config::load(self.config_path.as_deref()).context("failed to load config")?;
        if let Some(path) = config.loaded_from() {
            tracing::debug!(path = %path.display(), "loaded config file");
        }
        Ok(FileReconciler::new(
            Arc::new(config.forge()),
            config.commit_settings(),
        ))
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Create(args) => create(ctx, &args),
        Command::Read { id } => read(ctx, &id),
        Command::Update(args) => update(ctx, &args),
        Command::Delete { id } => delete(ctx, &id),
        Command::Import { id } => import(ctx, &id),
        Command::Id { action } => match action {
            IdAction::Encode(key) => encode_id(&key),
            IdAction::Decode { id } => decode_id(&id),
        },
        Command::Completion { shell } => completion(shell),
    }
}

impl KeyArgs {
    /// The key these arguments name, rejecting empty components.
    pub fn to_key(&self) -> Result<FileKey> {
        let key = FileKey::new(&self.owner, &self.repo, &self.branch, &self.path);
        key.validate()?;
        Ok(key)
    }
}

impl FileArgs {
    /// The desired file, reading contents from `--contents-file` if given.
    pub fn to_file(&self) -> Result<File> {
        let key = self.key.to_key()?;
        let contents = match (&self.contents, &self.contents_file) {
            (Some(contents), _) => contents.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            (None, None) => anyhow::bail!("one of --contents or --contents-file is required"),
        };
        Ok(File::new(key, contents))
    }
}

/// Print a value to stdout as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

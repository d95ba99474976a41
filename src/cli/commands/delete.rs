//! delete command - Remove a file by id

use super::Context;
use crate::core::id;
use crate::resource::FileLifecycle;
use anyhow::{Context as _, Result};

/// Remove the file named by `id`.
///
/// Succeeds without committing when the repository is archived or the file
/// is already gone.
pub fn delete(ctx: &Context, id: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(delete_async(ctx, id))
}

async fn delete_async(ctx: &Context, id: &str) -> Result<()> {
    let key = id::decode(id).context("failed to delete")?;
    let reconciler = ctx.reconciler()?;

    reconciler
        .delete(&key)
        .await
        .with_context(|| format!("failed to delete {}", id))?;

    if !ctx.quiet {
        eprintln!("Deleted {}", id);
    }
    Ok(())
}

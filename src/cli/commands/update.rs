//! update command - Commit new contents over an existing file

use super::{print_json, Context};
use crate::cli::args::FileArgs;
use crate::resource::FileLifecycle;
use anyhow::{Context as _, Result};

/// Commit the desired contents and print the observed result.
///
/// A commit is made even when the contents are unchanged.
pub fn update(ctx: &Context, args: &FileArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(update_async(ctx, args))
}

async fn update_async(ctx: &Context, args: &FileArgs) -> Result<()> {
    let desired = args.to_file()?;
    let reconciler = ctx.reconciler()?;

    let observed = reconciler
        .update(&desired)
        .await
        .with_context(|| format!("failed to update {}", desired.id()))?;

    tracing::info!(id = %observed.id(), "file updated");
    print_json(&observed)
}

//! create command - Commit a new file

use super::{print_json, Context};
use crate::cli::args::FileArgs;
use crate::resource::FileLifecycle;
use anyhow::{Context as _, Result};

/// Commit a new file and print the observed result.
pub fn create(ctx: &Context, args: &FileArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(create_async(ctx, args))
}

async fn create_async(ctx: &Context, args: &FileArgs) -> Result<()> {
    let desired = args.to_file()?;
    let reconciler = ctx.reconciler()?;

    let observed = reconciler
        .create(&desired)
        .await
        .with_context(|| format!("failed to create {}", desired.id()))?;

    tracing::info!(id = %observed.id(), "file created");
    print_json(&observed)
}

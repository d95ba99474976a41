//! import command - Adopt an existing file by id

use super::{print_json, Context};
use crate::resource::FileLifecycle;
use anyhow::Result;

/// Print the existing file named by `id` as JSON.
///
/// Unlike `read`, a missing file is an error.
pub fn import(ctx: &Context, id: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(import_async(ctx, id))
}

async fn import_async(ctx: &Context, id: &str) -> Result<()> {
    let reconciler = ctx.reconciler()?;
    let file = reconciler.import(id).await?;
    print_json(&file)
}

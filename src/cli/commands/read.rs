//! read command - Observe a file by id

use super::{print_json, Context};
use crate::core::id;
use crate::resource::FileLifecycle;
use anyhow::{Context as _, Result};

/// Print the file as JSON, or `null` when it no longer exists.
pub fn read(ctx: &Context, id: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(read_async(ctx, id))
}

async fn read_async(ctx: &Context, id: &str) -> Result<()> {
    let key = id::decode(id).context("failed to read")?;
    let reconciler = ctx.reconciler()?;

    match reconciler.read(&key).await {
        Ok(file) => print_json(&file),
        Err(err) if err.is_not_found() => {
            tracing::debug!(id, "file no longer exists");
            print_json(&serde_json::Value::Null)
        }
        Err(err) => Err(err.into()),
    }
}

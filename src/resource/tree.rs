//! resource::tree
//!
//! Tree surgery for deleting one file.
//!
//! GitHub builds a new tree from a base tree plus a list of entries, and
//! synthesises every directory from the blobs that survive. A tree-typed
//! entry handed back to it pins the old subtree in place, so the target
//! blob would come back with it. The editor therefore drops every tree
//! entry along with the target path.

use crate::forge::TreeEntry;

/// Remove `target` and every tree-typed entry from a recursive listing.
///
/// Order is preserved. The result is stable under repeated application.
pub fn remove_from_tree(entries: &[TreeEntry], target: &str) -> Vec<TreeEntry> {
    entries
        .iter()
        .filter(|entry| !entry.is_tree() && entry.path != target)
        .cloned()
        .collect()
}

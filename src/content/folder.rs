//! Folder-like content: a directory of recursively resolved children.

use std::collections::HashSet;
use std::path::Path;

use crate::api::{ApiError, ContentPath};
use crate::naming::reserve_sibling_name;
use crate::sync::SyncContext;
use crate::writer::WritePool;

use super::Content;

/// Handler for folders and lessons.
///
/// Children are resolved eagerly at construction so errors surface while
/// the node identity is still in scope; writing only walks the resolved
/// tree and schedules.
pub struct Folder {
    children: Vec<Content>,
}

impl Folder {
    pub(crate) async fn load(path: &ContentPath, ctx: &SyncContext) -> Result<Self, ApiError> {
        let nodes = ctx.api.fetch_children(path).await?;

        let mut children = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let child_path = path.child(&node.id);
            // Indirect async recursion (folder -> content -> folder) needs
            // one boxing point.
            let child = Box::pin(Content::load(node, &child_path, ctx)).await?;
            children.push(child);
        }

        Ok(Self { children })
    }

    /// Number of resolved children, including ignored ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the folder resolved no children at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) async fn write(self, target: &Path, pool: &WritePool) -> std::io::Result<()> {
        let mut names = HashSet::new();
        for child in self.children {
            if child.is_ignored() {
                continue;
            }
            // Sibling directories must not collide even when titles do.
            let name = reserve_sibling_name(&mut names, child.title());
            Box::pin(child.write_named(target, &name, pool)).await?;
        }
        Ok(())
    }
}

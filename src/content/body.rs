//! HTML body artifact of a content node.
//!
//! The body is mirrored twice over: the rewritten markup itself as an HTML
//! page, and every same-origin link it references as a direct download, so
//! the page keeps working offline.

use std::path::Path;

use crate::api::ApiError;
use crate::fetch::LinkedFile;
use crate::html::ContentParser;
use crate::sync::SyncContext;
use crate::writer::{WritePool, WriteTask};

/// Parsed and fetched body of one node.
pub struct ContentBody {
    markup: String,
    files: Vec<LinkedFile>,
}

impl ContentBody {
    /// Parses the body and fetches its same-origin links.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures; the caller decides which classes leave
    /// the node without a body.
    pub(crate) async fn load(markup: &str, ctx: &SyncContext) -> Result<Self, ApiError> {
        let parser = ContentParser::new(markup, ctx.api.base_url());

        let mut files = Vec::new();
        for link in parser.links() {
            // Cross-origin links stay links; only platform files are mirrored.
            if !link.href.starts_with(ctx.api.base_url()) {
                continue;
            }
            files.push(LinkedFile::load(link, ctx).await?);
        }

        Ok(Self {
            markup: parser.body().to_string(),
            files,
        })
    }

    /// Number of fetched same-origin links.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Schedules the page and its linked files into `target`.
    ///
    /// The page is named after the target directory itself.
    pub(crate) fn write(self, target: &Path, pool: &WritePool) {
        let stem = target
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("content");
        let page = target.join(format!("{stem}.html"));
        pool.submit(WriteTask::text(page, self.markup));

        for file in self.files {
            file.write(target, pool);
        }
    }
}

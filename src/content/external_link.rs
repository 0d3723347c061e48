//! External-link content: mirrored as an internet-shortcut file.

use std::path::Path;

use crate::api::{ApiError, ContentNode};
use crate::writer::{WritePool, WriteTask};

/// Handler for external-link items.
pub struct ExternalLink {
    url: String,
}

impl ExternalLink {
    pub(crate) fn new(node: &ContentNode) -> Result<Self, ApiError> {
        let url = node
            .content_handler
            .as_ref()
            .and_then(|handler| handler.url.clone())
            .ok_or_else(|| ApiError::validation("external link item carries no target URL"))?;
        Ok(Self { url })
    }

    /// Target URL of the link.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Schedules a `.url` shortcut next to the node's siblings.
    pub(crate) fn write(self, target: &Path, pool: &WritePool) {
        let shortcut = format!("[InternetShortcut]\nURL={}\n", self.url);
        pool.submit(WriteTask::text(target.with_extension("url"), shortcut));
    }
}

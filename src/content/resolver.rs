//! Per-node resolution: download decision, title, handler dispatch.

use std::path::Path;

use tracing::{info, warn};

use crate::api::{ApiError, ContentNode, ContentPath, HandlerKind};
use crate::html::ContentParser;
use crate::naming::sanitize_title;
use crate::sync::SyncContext;
use crate::writer::WritePool;

use super::{ContentBody, Document, ExternalLink, Folder};

/// Title used when every derivation tier comes up empty.
const UNTITLED: &str = "Untitled";

/// Handler variant for one content node.
///
/// The mapping from [`HandlerKind`] is total: unknown and missing kinds get
/// [`Handler::Unhandled`], which writes nothing and never errors, so new
/// remote content types cannot break a pass.
pub enum Handler {
    Folder(Folder),
    Document(Document),
    ExternalLink(ExternalLink),
    Unhandled,
}

impl Handler {
    async fn load(
        node: &ContentNode,
        path: &ContentPath,
        ctx: &SyncContext,
    ) -> Result<Self, ApiError> {
        match node.handler_kind() {
            Some(HandlerKind::Folder | HandlerKind::Lesson) => {
                Ok(Self::Folder(Folder::load(path, ctx).await?))
            }
            Some(HandlerKind::File | HandlerKind::Document | HandlerKind::Assignment) => {
                Ok(Self::Document(Document::load(node, path, ctx).await?))
            }
            Some(HandlerKind::ExternalLink) => Ok(Self::ExternalLink(ExternalLink::new(node)?)),
            Some(HandlerKind::Other(_)) | None => Ok(Self::Unhandled),
        }
    }

    /// Whether the variant mirrors into a directory of its own.
    fn needs_directory(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    async fn write(self, target: &Path, pool: &WritePool) -> std::io::Result<()> {
        match self {
            Self::Folder(folder) => folder.write(target, pool).await,
            Self::Document(document) => document.write(target, pool).await,
            Self::ExternalLink(link) => {
                link.write(target, pool);
                Ok(())
            }
            Self::Unhandled => Ok(()),
        }
    }
}

/// A resolved content node, ready to mirror itself under a parent path.
pub struct Content {
    ignored: bool,
    title: String,
    handler: Option<Handler>,
    body: Option<ContentBody>,
}

impl Content {
    /// Resolves one node within the pass.
    ///
    /// Fetch errors are logged against this node and leave it empty; they
    /// never affect sibling nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`], the one class that is not
    /// contained at the node boundary.
    pub async fn load(
        node: &ContentNode,
        path: &ContentPath,
        ctx: &SyncContext,
    ) -> Result<Self, ApiError> {
        info!(node = %node.log_identity(), "resolving content");

        if !should_download(node, ctx) {
            return Ok(Self {
                ignored: true,
                title: String::new(),
                handler: None,
                body: None,
            });
        }

        let title = derive_title(node, ctx);

        // Session loss is the only class that escapes the node boundary;
        // everything else leaves this node empty and its siblings alone.
        let handler = match Handler::load(node, path, ctx).await {
            Ok(handler) => Some(handler),
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(error) => {
                warn!(node = %node.log_identity(), error = %error, "error fetching content");
                None
            }
        };

        let body = match node.body.as_deref().filter(|markup| !markup.is_empty()) {
            Some(markup) => match ContentBody::load(markup, ctx).await {
                Ok(body) => Some(body),
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(error) => {
                    warn!(node = %node.log_identity(), error = %error, "error fetching content body");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            ignored: false,
            title,
            handler,
            body,
        })
    }

    /// Whether the node was judged not worth downloading this pass.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Sanitized title; empty for ignored nodes.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Mirrors this node under `parent`.
    ///
    /// No-op for ignored nodes. Creates the handler's directory when its
    /// capability flag demands one, delegates, then writes the body
    /// artifact into the same target.
    ///
    /// # Errors
    ///
    /// Returns directory-creation errors on the submitting path; scheduled
    /// write outcomes surface at the pass-level join instead.
    pub async fn write(self, parent: &Path, pool: &WritePool) -> std::io::Result<()> {
        let name = self.title.clone();
        self.write_named(parent, &name, pool).await
    }

    /// Like [`write`](Self::write), with a caller-chosen (deduplicated)
    /// directory name.
    pub(crate) async fn write_named(
        self,
        parent: &Path,
        name: &str,
        pool: &WritePool,
    ) -> std::io::Result<()> {
        if self.ignored {
            return Ok(());
        }

        let target = parent.join(name);

        if let Some(handler) = self.handler {
            if handler.needs_directory() {
                tokio::fs::create_dir_all(&target).await?;
            }
            handler.write(&target, pool).await?;
        }

        if let Some(body) = self.body {
            tokio::fs::create_dir_all(&target).await?;
            body.write(&target, pool);
        }

        Ok(())
    }
}

/// Download decision: skip only unchanged leaves and unavailable nodes.
///
/// Folders and lessons keep their has-children flag set, so they are
/// traversed every pass to discover changed descendants.
fn should_download(node: &ContentNode, ctx: &SyncContext) -> bool {
    (ctx.has_changed(node.modified) || node.has_children) && node.is_available()
}

/// Title cascade: node title, body text, first link text, `"Untitled"`.
fn derive_title(node: &ContentNode, ctx: &SyncContext) -> String {
    let chosen = node
        .display_title()
        .map(ToString::to_string)
        .or_else(|| {
            let markup = node.body.as_deref().filter(|b| !b.is_empty())?;
            let parser = ContentParser::new(markup, ctx.api.base_url());
            parser
                .first_text_line()
                .map(ToString::to_string)
                .or_else(|| parser.links().first().map(|link| link.text.clone()))
        })
        .unwrap_or_else(|| UNTITLED.to_string());

    sanitize_title(&chosen)
}

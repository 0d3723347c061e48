//! One retained attachment of a document-like node.

use std::path::Path;

use crate::api::{ApiError, AttachmentDescriptor, ContentPath, DirectResponse};
use crate::naming::sanitize_filename;
use crate::sync::SyncContext;
use crate::writer::{WritePool, WriteTask};

/// A fetched attachment, named by its declared filename.
pub struct Attachment {
    title: String,
    stream: DirectResponse,
}

impl Attachment {
    /// Opens the attachment's byte stream within the pass session.
    pub(crate) async fn load(
        descriptor: AttachmentDescriptor,
        path: &ContentPath,
        ctx: &SyncContext,
    ) -> Result<Self, ApiError> {
        let stream = ctx.api.fetch_attachment_stream(path, &descriptor.id).await?;
        Ok(Self {
            title: sanitize_filename(&descriptor.file_name),
            stream,
        })
    }

    /// Sanitized filename the attachment will be written under.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Schedules the stream write into `dir`.
    pub(crate) fn write(self, dir: &Path, pool: &WritePool) {
        pool.submit(WriteTask::stream(dir.join(&self.title), self.stream.body));
    }
}

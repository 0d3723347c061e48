//! Direct-download artifacts for links discovered in content bodies.
//!
//! A [`LinkedFile`] is one fetched link: the response is opened immediately
//! on the driving task, judged by the acceptance gate, and only scheduled
//! for writing when it passes. Rejected responses are discarded without a
//! sound; body links point at all kinds of things (streamed video, huge
//! archives, cross-origin pages) that a mirror has no business copying.

use std::path::Path;

use tracing::debug;
use url::Url;

use crate::api::{ApiError, ByteSource, DirectResponse};
use crate::html::{Link, generated_placeholder, is_opaque_id, percent_decoded};
use crate::naming::{content_disposition_filename, extension_for_mime, sanitize_filename};
use crate::sync::SyncContext;
use crate::writer::{WritePool, WriteTask};

/// Largest direct download accepted (20 MiB).
pub const MAX_CONTENT_LENGTH: u64 = 20 * 1024 * 1024;

/// A fetched body link, ready to be scheduled or discarded.
pub struct LinkedFile {
    filename: String,
    extension: Option<&'static str>,
    valid: bool,
    body: ByteSource,
}

impl LinkedFile {
    /// Fetches a link within the pass session.
    ///
    /// # Errors
    ///
    /// Fails with [`ApiError`] when the fetch itself fails; an unacceptable
    /// response is not an error, it just never schedules a write.
    pub(crate) async fn load(link: &Link, ctx: &SyncContext) -> Result<Self, ApiError> {
        let response = ctx.api.fetch_direct(&link.href).await?;

        let filename = derive_filename(&response, link);
        let extension = response
            .content_type
            .as_deref()
            .and_then(extension_for_mime);
        let valid = validate(&response, &link.href, ctx.api.base_url());

        if !valid {
            debug!(
                href = %link.href,
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                content_length = response.content_length.unwrap_or(0),
                "response rejected, not scheduling"
            );
        }

        Ok(Self {
            filename,
            extension,
            valid,
            body: response.body,
        })
    }

    /// Schedules the write into `dir` when the response was accepted.
    pub(crate) fn write(self, dir: &Path, pool: &WritePool) {
        if !self.valid {
            return;
        }

        let mut path = dir.join(&self.filename);
        if let Some(extension) = self.extension {
            path.set_extension(extension);
        }

        pool.submit(WriteTask::stream(path, self.body));
    }
}

/// Filename heuristic: declared header, then the link's display text, then
/// the URL path, then a generated placeholder.
fn derive_filename(response: &DirectResponse, link: &Link) -> String {
    let candidate = response
        .content_disposition
        .as_deref()
        .and_then(content_disposition_filename)
        .unwrap_or_else(|| {
            let text = link.text.trim();
            if !text.is_empty() && !text.contains('=') && !is_opaque_id(text) {
                text.to_string()
            } else {
                basename_of(&link.href).unwrap_or_else(generated_placeholder)
            }
        });

    sanitize_filename(&percent_decoded(&candidate))
}

fn basename_of(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let last = url.path_segments()?.next_back()?;
    (!last.is_empty()).then(|| percent_decoded(last))
}

/// Acceptance gate over a direct response.
///
/// Accepts only successful, same-origin, non-video responses whose declared
/// length is strictly under [`MAX_CONTENT_LENGTH`].
fn validate(response: &DirectResponse, href: &str, base_url: &str) -> bool {
    if !response.is_success() {
        return false;
    }

    let content_type = response.content_type.as_deref().unwrap_or("");

    href.starts_with(base_url)
        && !content_type.contains("video")
        && response.content_length.unwrap_or(0) < MAX_CONTENT_LENGTH
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::stream;

    use super::*;

    const BASE: &str = "https://campus.example.edu";

    fn response(
        status: u16,
        content_type: Option<&str>,
        content_length: Option<u64>,
        content_disposition: Option<&str>,
    ) -> DirectResponse {
        DirectResponse {
            status,
            content_type: content_type.map(ToString::to_string),
            content_length,
            content_disposition: content_disposition.map(ToString::to_string),
            body: Box::pin(stream::empty()),
        }
    }

    fn link(href: &str, text: &str) -> Link {
        Link {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    // --- validate ---

    #[test]
    fn test_validate_accepts_small_same_origin_document() {
        let resp = response(200, Some("application/pdf"), Some(1024), None);
        assert!(validate(&resp, &format!("{BASE}/files/a.pdf"), BASE));
    }

    #[test]
    fn test_validate_rejects_non_success_status() {
        let resp = response(404, Some("application/pdf"), Some(1024), None);
        assert!(!validate(&resp, &format!("{BASE}/files/a.pdf"), BASE));
    }

    #[test]
    fn test_validate_rejects_cross_origin_link() {
        let resp = response(200, Some("application/pdf"), Some(1024), None);
        assert!(!validate(&resp, "https://elsewhere.example.org/a.pdf", BASE));
    }

    #[test]
    fn test_validate_rejects_video_content_type() {
        let resp = response(200, Some("video/mp4"), Some(1024), None);
        assert!(!validate(&resp, &format!("{BASE}/files/lecture"), BASE));
    }

    #[test]
    fn test_validate_rejects_at_length_ceiling() {
        let resp = response(200, Some("application/zip"), Some(MAX_CONTENT_LENGTH), None);
        assert!(!validate(&resp, &format!("{BASE}/files/big.zip"), BASE));

        let resp = response(
            200,
            Some("application/zip"),
            Some(MAX_CONTENT_LENGTH - 1),
            None,
        );
        assert!(validate(&resp, &format!("{BASE}/files/big.zip"), BASE));
    }

    #[test]
    fn test_validate_accepts_missing_length_header() {
        let resp = response(200, Some("application/pdf"), None, None);
        assert!(validate(&resp, &format!("{BASE}/files/a.pdf"), BASE));
    }

    // --- derive_filename ---

    #[test]
    fn test_filename_prefers_content_disposition() {
        let resp = response(
            200,
            Some("application/pdf"),
            Some(10),
            Some(r#"attachment; filename="declared.pdf""#),
        );
        let name = derive_filename(&resp, &link(&format!("{BASE}/dl"), "Display Name"));
        assert_eq!(name, "declared.pdf");
    }

    #[test]
    fn test_filename_falls_back_to_display_text() {
        let resp = response(200, Some("application/pdf"), Some(10), None);
        let name = derive_filename(&resp, &link(&format!("{BASE}/dl"), "Week 3 Notes"));
        assert_eq!(name, "Week 3 Notes");
    }

    #[test]
    fn test_filename_rejects_query_like_display_text() {
        let resp = response(200, None, None, None);
        let name = derive_filename(
            &resp,
            &link(&format!("{BASE}/files/fallback.pdf"), "xid=19839037_1"),
        );
        assert_eq!(name, "fallback.pdf");
    }

    #[test]
    fn test_filename_rejects_opaque_display_text() {
        let resp = response(200, None, None, None);
        let name = derive_filename(
            &resp,
            &link(&format!("{BASE}/files/real%20name.pdf"), "xid-19839037_1"),
        );
        assert_eq!(name, "real name.pdf");
    }

    #[test]
    fn test_filename_generates_placeholder_when_everything_fails() {
        let resp = response(200, None, None, None);
        let name = derive_filename(&resp, &link(&format!("{BASE}/"), ""));
        // Trailing-slash path has an empty final segment.
        assert!(name.starts_with("file-"), "got {name}");
    }

    #[test]
    fn test_filename_is_sanitized() {
        let resp = response(
            200,
            None,
            None,
            Some(r#"attachment; filename="seminar: part 2.pdf""#),
        );
        let name = derive_filename(&resp, &link(&format!("{BASE}/dl"), ""));
        assert_eq!(name, "seminar_ part 2.pdf");
    }

    // --- write path shaping ---

    #[tokio::test]
    async fn test_rejected_response_schedules_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = WritePool::new(1).unwrap();
        let file = LinkedFile {
            filename: "a.pdf".to_string(),
            extension: None,
            valid: false,
            body: Box::pin(stream::empty()),
        };
        file.write(dir.path(), &pool);
        assert_eq!(pool.task_count(), 0);
    }

    #[tokio::test]
    async fn test_mapped_extension_replaces_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = WritePool::new(1).unwrap();
        let file = LinkedFile {
            filename: "report.bin".to_string(),
            extension: Some("pdf"),
            valid: true,
            body: Box::pin(stream::empty()),
        };
        file.write(dir.path(), &pool);

        for handle in pool.take_handles() {
            assert_eq!(handle.path(), dir.path().join("report.pdf"));
            let _ = handle.join.await;
        }
    }

    #[tokio::test]
    async fn test_unmapped_extension_preserves_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = WritePool::new(1).unwrap();
        let file = LinkedFile {
            filename: "report.pdf".to_string(),
            extension: None,
            valid: true,
            body: Box::pin(stream::empty()),
        };
        file.write(dir.path(), &pool);

        for handle in pool.take_handles() {
            assert_eq!(handle.path(), dir.path().join("report.pdf"));
            let _ = handle.join.await;
        }
    }
}

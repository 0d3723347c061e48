//! Remote platform API surface.
//!
//! The core only ever talks to the platform through [`CourseApi`], an
//! object-safe trait, so the sync pipeline can be driven by the real
//! [`RestClient`] or by an in-test fake without touching the network.

mod client;
mod error;
pub mod filters;
mod types;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

pub use client::RestClient;
pub use error::ApiError;
pub use filters::AttachmentFilter;
pub use types::{
    AttachmentDescriptor, Availability, BODY_PLACEHOLDER_TITLE, ContentHandlerRef, ContentNode,
    ContentPath, HandlerKind,
};

/// Byte stream of a direct download.
///
/// Boxed so responses and test fixtures share one shape; each stream is
/// consumed exactly once by the write task that owns it.
pub type ByteSource = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// A streaming response from a direct fetch.
///
/// Carries only the pieces the acceptance gate and the write path need.
pub struct DirectResponse {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    /// Raw `Content-Disposition` header, if any.
    pub content_disposition: Option<String>,
    /// Response body.
    pub body: ByteSource,
}

impl DirectResponse {
    /// Whether the status code is in the success range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for DirectResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

/// Client for the platform's course-content API.
#[async_trait]
pub trait CourseApi: Send + Sync {
    /// Origin the client is bound to, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Lists the children of a content item (or a course's root listing).
    async fn fetch_children(&self, path: &ContentPath) -> Result<Vec<ContentNode>, ApiError>;

    /// Lists the file attachments of a content item.
    ///
    /// Fails with [`ApiError::BadRequest`] for content kinds that do not
    /// support attachments; callers decide whether that is an error.
    async fn fetch_attachments(
        &self,
        path: &ContentPath,
    ) -> Result<Vec<AttachmentDescriptor>, ApiError>;

    /// Opens the byte stream of one attachment.
    async fn fetch_attachment_stream(
        &self,
        path: &ContentPath,
        attachment_id: &str,
    ) -> Result<DirectResponse, ApiError>;

    /// Fetches an arbitrary URL within the platform session.
    ///
    /// Non-success statuses other than 401/403 are returned in the
    /// [`DirectResponse`] for the caller's acceptance gate to judge.
    async fn fetch_direct(&self, url: &str) -> Result<DirectResponse, ApiError>;
}

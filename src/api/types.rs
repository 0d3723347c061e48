//! Wire types for the platform's course-content API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Title the platform substitutes for items that only carry an HTML body.
///
/// Treated as absent during title derivation.
pub const BODY_PLACEHOLDER_TITLE: &str = "ultraDocumentBody";

/// One item in the course-content tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Platform identifier for the item.
    pub id: String,
    /// Display title; may be absent or the body placeholder.
    #[serde(default)]
    pub title: Option<String>,
    /// Raw HTML body, when the item carries one.
    #[serde(default)]
    pub body: Option<String>,
    /// Semantic type tag.
    #[serde(default)]
    pub content_handler: Option<ContentHandlerRef>,
    /// Last modification time reported by the platform.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// Whether the item has child items to traverse.
    #[serde(default)]
    pub has_children: bool,
    /// Visibility of the item to the current session.
    #[serde(default)]
    pub availability: Option<Availability>,
}

impl ContentNode {
    /// Title as shown to users, with the body placeholder treated as absent.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty() && *t != BODY_PLACEHOLDER_TITLE)
    }

    /// Semantic kind, or `None` when the platform sent no handler tag.
    #[must_use]
    pub fn handler_kind(&self) -> Option<HandlerKind> {
        self.content_handler
            .as_ref()
            .map(|h| HandlerKind::from_id(&h.id))
    }

    /// Whether the item is visible to the current session.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.availability
            .as_ref()
            .is_some_and(|a| a.available.eq_ignore_ascii_case("yes"))
    }

    /// Identity string for log lines.
    #[must_use]
    pub fn log_identity(&self) -> String {
        let kind = self
            .content_handler
            .as_ref()
            .map_or("(no handler)", |h| h.id.as_str());
        format!("{}[{kind}]", self.title.as_deref().unwrap_or("(untitled)"))
    }
}

/// The platform's handler tag on a content item.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentHandlerRef {
    /// Handler identifier, e.g. `resource/x-bb-folder`.
    pub id: String,
    /// Target URL; present for external-link items.
    #[serde(default)]
    pub url: Option<String>,
}

/// Visibility flag on a content item.
#[derive(Debug, Clone, Deserialize)]
pub struct Availability {
    /// `"Yes"` when the item is visible to the current session.
    pub available: String,
}

impl Availability {
    /// Shorthand for constructing a visible/hidden flag.
    #[must_use]
    pub fn new(available: bool) -> Self {
        Self {
            available: if available { "Yes" } else { "No" }.to_string(),
        }
    }
}

/// Semantic type of a content node, decoded from the handler id.
///
/// The mapping is total: unrecognized ids land in [`HandlerKind::Other`] so
/// new remote content types degrade to a no-op instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    Folder,
    Lesson,
    File,
    Document,
    Assignment,
    ExternalLink,
    Other(String),
}

impl HandlerKind {
    /// Decodes a platform handler id.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "resource/x-bb-folder" => Self::Folder,
            "resource/x-bb-lesson" => Self::Lesson,
            "resource/x-bb-file" => Self::File,
            "resource/x-bb-document" => Self::Document,
            "resource/x-bb-assignment" => Self::Assignment,
            "resource/x-bb-externallink" => Self::ExternalLink,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One attachment on a document-like content item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    /// Platform identifier used for the download endpoint.
    pub id: String,
    /// Declared filename.
    pub file_name: String,
    /// Declared mime type.
    #[serde(default)]
    pub mime_type: String,
}

/// API path parameters addressing a content item within a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    /// Course the item belongs to.
    pub course_id: String,
    /// The item itself; `None` addresses the course's root listing.
    pub content_id: Option<String>,
}

impl ContentPath {
    /// Path addressing the top-level contents of a course.
    #[must_use]
    pub fn course_root(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            content_id: None,
        }
    }

    /// Path addressing a child item in the same course.
    #[must_use]
    pub fn child(&self, content_id: impl Into<String>) -> Self {
        Self {
            course_id: self.course_id.clone(),
            content_id: Some(content_id.into()),
        }
    }
}

//! Mime-type filtering for attachment lists.

use super::types::AttachmentDescriptor;

/// Pure predicate filter over attachment descriptors by mime-type glob.
///
/// Patterns are either exact (`application/pdf`) or a category glob
/// (`video/*`, `*/*`). The default configuration excludes `video/*`, since
/// lecture recordings dwarf everything else in a course and are streamed,
/// not mirrored.
#[derive(Debug, Clone)]
pub struct AttachmentFilter {
    exclude: Vec<String>,
}

impl Default for AttachmentFilter {
    fn default() -> Self {
        Self::excluding(["video/*"])
    }
}

impl AttachmentFilter {
    /// Builds a filter from an explicit exclusion list.
    pub fn excluding<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a mime type is excluded by this filter.
    #[must_use]
    pub fn excludes(&self, mime_type: &str) -> bool {
        self.exclude
            .iter()
            .any(|pattern| mime_glob_matches(pattern, mime_type))
    }

    /// Retains attachments whose mime type passes the filter.
    ///
    /// Order-preserving; never deduplicates.
    #[must_use]
    pub fn filter(&self, attachments: Vec<AttachmentDescriptor>) -> Vec<AttachmentDescriptor> {
        attachments
            .into_iter()
            .filter(|a| !self.excludes(&a.mime_type))
            .collect()
    }
}

/// Matches a mime type against an exact pattern or `type/*` category glob.
fn mime_glob_matches(pattern: &str, mime_type: &str) -> bool {
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();

    if pattern == "*/*" {
        return true;
    }

    match pattern.strip_suffix("/*") {
        Some(category) => mime
            .split('/')
            .next()
            .is_some_and(|m| m == category),
        None => mime == pattern,
    }
}

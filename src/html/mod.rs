//! Link discovery and naming inside content HTML bodies.
//!
//! Content items on the platform embed their files as anchors and images
//! whose URLs point at opaque repository ids rather than anything a person
//! would recognize. [`ContentParser`] walks a body fragment once and, for
//! each downloadable link, derives a human-readable display name through an
//! ordered cascade over the element's accessibility metadata, visible text,
//! and URL structure. Same-origin links are additionally rewritten to the
//! derived name so the mirrored HTML references the local files.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;
use url::Url;

/// Prefix of the platform's internal repository ids.
///
/// Tokens carrying it must never surface as a human-facing filename.
const OPAQUE_ID_PREFIX: &str = "xid";

/// Query parameters consulted for a filename, most trustworthy first.
const FILENAME_PARAMS: [&str; 4] = ["filename", "file", "name", "FileName"];

/// Accessibility labels the platform puts on file links, e.g.
/// `"Preview File report_final.pdf"`.
#[allow(clippy::expect_used)]
static FILE_LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Preview File|Download|File)\s+(.+?)\s*$")
        .expect("file label regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("anchor selector is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img[src]").expect("image selector is valid") // Static pattern, safe to panic
});

/// One downloadable link discovered in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link target exactly as it appeared in the markup.
    pub href: String,
    /// Derived display name.
    pub text: String,
}

/// Parsed content body: rewritten markup, plain text, and discovered links.
///
/// All three are produced by a single parse and cached for the object's
/// lifetime.
#[derive(Debug)]
pub struct ContentParser {
    body: String,
    text: String,
    links: Vec<Link>,
}

impl ContentParser {
    /// Parses an HTML fragment against the platform origin.
    #[must_use]
    pub fn new(fragment: &str, base_url: &str) -> Self {
        let doc = Html::parse_fragment(fragment);
        let root = doc.root_element();

        // Work on the normalized serialization so in-place attribute
        // rewrites can match on serialized element text.
        let mut body = root.inner_html();
        let text = root.text().collect::<String>();

        let mut links = Vec::new();
        for (selector, attr) in [(&*ANCHOR_SELECTOR, "href"), (&*IMAGE_SELECTOR, "src")] {
            for element in doc.select(selector) {
                let Some(uri) = element.value().attr(attr) else {
                    continue;
                };
                if uri.is_empty() {
                    continue;
                }

                let display = derive_display_name(element, uri, base_url);
                trace!(uri, display = %display, "discovered link");

                if uri.starts_with(base_url) {
                    rewrite_attribute(&mut body, element, attr, uri, &display);
                }

                links.push(Link {
                    href: uri.to_string(),
                    text: display,
                });
            }
        }

        Self { body, text, links }
    }

    /// Serialized body with same-origin links rewritten to display names.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Plain extracted text of the fragment.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Discovered links, in document order (anchors before images).
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// First non-empty line of the extracted text.
    #[must_use]
    pub fn first_text_line(&self) -> Option<&str> {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }
}

/// Whether a candidate name leaks an internal repository id.
pub(crate) fn is_opaque_id(candidate: &str) -> bool {
    candidate
        .get(..OPAQUE_ID_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(OPAQUE_ID_PREFIX))
}

/// Display-name cascade for one element. First satisfied rule wins; every
/// rule rejects opaque-id candidates.
fn derive_display_name(element: ElementRef<'_>, uri: &str, base_url: &str) -> String {
    let resolved = resolve_url(uri, base_url);

    // Rule 1: accessibility label carrying the filename.
    if let Some(label) = element.value().attr("aria-label")
        && let Some(captures) = FILE_LABEL_PATTERN.captures(label)
    {
        let candidate = captures[1].trim();
        if !candidate.is_empty() && !is_opaque_id(candidate) {
            return candidate.to_string();
        }
    }

    // Rule 2: a companion reference attribute marks repository links whose
    // real filename hides in the query string.
    if element
        .value()
        .attr("aria-controls")
        .is_some_and(|controls| controls.contains("xid-"))
        && let Some(url) = &resolved
        && let Some(candidate) = first_query_param(url, &FILENAME_PARAMS)
        && !is_opaque_id(&candidate)
    {
        return candidate;
    }

    // Rule 3: visible element text.
    let visible = element.text().collect::<String>();
    let visible = visible.trim();
    if !visible.is_empty() && !is_opaque_id(visible) {
        return visible.to_string();
    }

    // Rule 4: URL structure.
    name_from_url(resolved.as_ref())
}

fn name_from_url(resolved: Option<&Url>) -> String {
    let mut last = resolved
        .and_then(|url| url.path_segments())
        .and_then(|mut segments| segments.next_back())
        .map(percent_decoded)
        .unwrap_or_default();

    if last.is_empty() || last.contains('=') || is_opaque_id(&last) {
        // The query string may still carry the filename; the opaque id
        // itself is the last resort among the parameters, its value does
        // not carry the prefix.
        let keys = ["filename", "file", "name", "FileName", OPAQUE_ID_PREFIX];
        if let Some(url) = resolved
            && let Some(candidate) = first_query_param(url, &keys)
        {
            last = candidate;
        }
    }

    if !last.is_empty() {
        return last;
    }

    resolved
        .and_then(|url| url.host_str())
        .filter(|host| !host.is_empty())
        .map_or_else(generated_placeholder, ToString::to_string)
}

/// Fresh unique name for links that defeat every heuristic.
pub(crate) fn generated_placeholder() -> String {
    format!("file-{:016x}", rand::random::<u64>())
}

fn resolve_url(uri: &str, base_url: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(uri) {
        return Some(url);
    }
    Url::parse(base_url).ok()?.join(uri).ok()
}

fn first_query_param(url: &Url, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some((_, value)) = url
            .query_pairs()
            .find(|(k, v)| k == key && !v.is_empty())
        {
            return Some(value.into_owned());
        }
    }
    None
}

pub(crate) fn percent_decoded(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |d| d.into_owned())
}

/// Replaces the element's link attribute with the display name inside the
/// serialized body. Best effort: both needle and haystack come from the
/// same serializer, so a well-formed element matches exactly once.
fn rewrite_attribute(body: &mut String, element: ElementRef<'_>, attr: &str, uri: &str, display: &str) {
    let outer = element.html();
    let needle = format!("{attr}=\"{}\"", escape_attribute(uri));
    let replacement = format!("{attr}=\"{}\"", escape_attribute(display));
    let rewritten = outer.replacen(&needle, &replacement, 1);
    if rewritten != outer {
        *body = body.replacen(&outer, &rewritten, 1);
    }
}

/// Attribute-value escaping matching the serializer's output.
fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

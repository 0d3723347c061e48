//! Filesystem-safe names for mirrored content.
//!
//! Titles come from unreliable places (API metadata, HTML bodies, URLs,
//! Content-Disposition headers), so everything that ends up on disk passes
//! through the sanitizers in this module.

use std::collections::HashSet;
use std::path::{Component, Path};

/// Replaces characters that are invalid on common filesystems.
///
/// Handles `/ \ : * ? " < > |` plus control characters. Dot-only segments
/// (`.`, `..`) are rewritten so a name can never escape its parent directory.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if replaced.is_empty() {
        return "_".to_string();
    }

    if is_plain_segment(&replaced) {
        replaced
    } else {
        replaced
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

/// Derives a path-segment-safe directory title from free-form text.
///
/// Literal dots become underscores before the regular filename pass, so a
/// content titled `Unit 1. Intro` produces the directory `Unit 1_ Intro`
/// rather than something that looks like a file extension. Idempotent.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    sanitize_filename(&title.replace('.', "_"))
}

fn is_plain_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Reserves a name that is unique among the siblings seen so far.
///
/// First occurrence keeps its name; later occurrences get a `_2`, `_3`, ...
/// suffix inserted before the extension.
pub fn reserve_sibling_name(seen: &mut HashSet<String>, name: &str) -> String {
    if seen.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let mut counter = 2usize;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Extracts the filename parameter from a Content-Disposition header.
///
/// Implements the filename-parameter grammar rather than a permissive
/// pattern match: `filename="quoted"`, unquoted `filename=`, and RFC 5987
/// `filename*=charset''percent-encoded`. Returns `None` when no well-formed
/// parameter is present, letting callers fall through to other heuristics.
#[must_use]
pub fn content_disposition_filename(header: &str) -> Option<String> {
    // RFC 5987 extended form wins when present and well-formed.
    if let Some(extended) = extended_filename_param(header) {
        return Some(extended);
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim_start();

    if let Some(quoted) = value.strip_prefix('"') {
        let end = quoted.find('"')?;
        let name = &quoted[..end];
        return (!name.is_empty()).then(|| name.to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let name = value[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn extended_filename_param(header: &str) -> Option<String> {
    let pos = header.find("filename*=")?;
    let value = header[pos + "filename*=".len()..].trim_start();

    // Grammar: charset'language'value-chars
    let charset_end = value.find('\'')?;
    let rest = &value[charset_end + 1..];
    let lang_end = rest.find('\'')?;
    let encoded = &rest[lang_end + 1..];

    let end = encoded.find(';').unwrap_or(encoded.len());
    let encoded = encoded[..end].trim().trim_matches('"');
    if encoded.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(encoded).ok()?;
    Some(decoded.into_owned())
}

/// Best-effort file extension for a declared content type.
///
/// Returns the extension without a leading dot, or `None` for types outside
/// the table so an existing extension in the filename is preserved.
#[must_use]
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "text/html" => Some("html"),
        "text/plain" => Some("txt"),
        "application/json" => Some("json"),
        "application/xml" | "text/xml" => Some("xml"),
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.ms-powerpoint" => Some("ppt"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => Some("pptx"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "application/zip" => Some("zip"),
        "application/gzip" => Some("gz"),
        "text/csv" => Some("csv"),
        "text/markdown" => Some("md"),
        _ => None,
    }
}

//! Filesystem utilities
//!
//! Filename handling for the transfer planner: header-supplied names,
//! URL-derived names, and resume bookkeeping.

use std::path::Path;

use content_disposition::parse_content_disposition;
use percent_encoding::percent_decode_str;
use sanitize_filename::Options as SanitizeOptions;
use url::Url;

/// Extract filename from Content-Disposition header
///
/// Handles both RFC 5987 encoded (filename*=) and regular (filename=) formats.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let parsed = parse_content_disposition(header);
    parsed
        .filename_full()
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty())
}

/// Sanitize a filename for safe filesystem usage
///
/// Replaces invalid characters and Windows reserved names.
pub fn sanitize(name: &str) -> String {
    sanitize_filename::sanitize_with_options(name, SanitizeOptions {
        replacement: "_",
        windows: true,
        truncate: true,
    })
}

/// Derive a filename from the last path segment of a URL, percent-decoded
/// and sanitized. `None` when the path has no usable segment.
pub fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let name = sanitize(decoded.as_ref());
    if name.is_empty() || name == "_" {
        None
    } else {
        Some(name)
    }
}

/// Size of an existing, non-empty regular file. `None` for missing, empty,
/// or non-file paths; a resume offset of zero carries no information.
pub fn resumable_len(path: &Path) -> Option<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

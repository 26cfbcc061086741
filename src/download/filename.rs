//! Filename derivation for downloaded resources.
//!
//! The filename is the basename of the decoded URL path. When that basename
//! is empty or carries no extension of its own (query-only download
//! endpoints, trailing slashes, bare `.ext` segments), a name is synthesized
//! from the classified extension and the current history size.

use std::path::Path;

/// Derives the local filename for a resource.
///
/// `decoded_url` is the percent-decoded absolute URL, `extension` the
/// classified extension (leading dot), and `history_len` the history size
/// immediately after this URL's insertion - it becomes the `<n>` in
/// synthesized `file_<n><ext>` names.
#[must_use]
pub fn derive_filename(decoded_url: &str, extension: &str, history_len: usize) -> String {
    match path_basename(decoded_url) {
        Some(name) if has_extension(&name) => sanitize_filename(&name),
        _ => format!("file_{history_len}{extension}"),
    }
}

/// Basename of the decoded URL's path: the segment after the last `/`,
/// with query string and fragment stripped first.
fn path_basename(decoded_url: &str) -> Option<String> {
    let end = decoded_url
        .find(['?', '#'])
        .unwrap_or(decoded_url.len());
    let path = &decoded_url[..end];
    let name = path.rsplit('/').next().unwrap_or("");
    (!name.is_empty()).then(|| name.to_string())
}

/// True when the name carries a non-leading dot, i.e. a real extension.
/// A bare `.ext` segment counts as extensionless, matching how hidden
/// files are conventionally split.
fn has_extension(name: &str) -> bool {
    matches!(name.rfind('.'), Some(index) if index > 0)
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Joins a category directory and filename, refusing to escape the base.
///
/// `sanitize_filename` already strips path separators, so this is plain
/// composition kept in one place.
#[must_use]
pub fn destination_path(base: &Path, category_dir: &str, filename: &str) -> std::path::PathBuf {
    base.join(category_dir).join(filename)
}

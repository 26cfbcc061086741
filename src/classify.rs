//! Extension-based classification of candidate URLs.
//!
//! Classification is by path suffix alone: the lowercase extension of the
//! URL's path component is looked up in a static table. There is no MIME
//! sniffing and no content-based detection, so a mislabeled extension is
//! classified incorrectly by design.

use std::fmt;

use url::Url;

/// Category a downloadable file is filed under.
///
/// Categories partition the fixed set of supported extensions; each category
/// maps to one subdirectory of the download base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Text documents (.pdf, .doc, .docx, .txt, .rtf)
    Documents,
    /// Tabular data (.xls, .xlsx, .csv)
    Spreadsheets,
    /// Slide decks (.ppt, .pptx)
    Presentations,
    /// Raster images (.jpg, .jpeg, .png, .gif, .bmp, .webp)
    Images,
    /// Structured data formats (.json, .xml, .yaml, .yml)
    Data,
}

impl Category {
    /// All categories, in directory-creation order.
    pub const ALL: [Category; 5] = [
        Category::Documents,
        Category::Spreadsheets,
        Category::Presentations,
        Category::Images,
        Category::Data,
    ];

    /// Name of the subdirectory this category's files are saved under.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Documents => "documents",
            Category::Spreadsheets => "spreadsheets",
            Category::Presentations => "presentations",
            Category::Images => "images",
            Category::Data => "data",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Static extension → category table. Every key carries its leading dot and
/// is lowercase; lookups normalize case before matching.
const CATEGORY_MAP: &[(&str, Category)] = &[
    // Documents
    (".pdf", Category::Documents),
    (".doc", Category::Documents),
    (".docx", Category::Documents),
    (".txt", Category::Documents),
    (".rtf", Category::Documents),
    // Spreadsheets
    (".xls", Category::Spreadsheets),
    (".xlsx", Category::Spreadsheets),
    (".csv", Category::Spreadsheets),
    // Presentations
    (".ppt", Category::Presentations),
    (".pptx", Category::Presentations),
    // Images
    (".jpg", Category::Images),
    (".jpeg", Category::Images),
    (".png", Category::Images),
    (".gif", Category::Images),
    (".bmp", Category::Images),
    (".webp", Category::Images),
    // Data formats
    (".json", Category::Data),
    (".xml", Category::Data),
    (".yaml", Category::Data),
    (".yml", Category::Data),
];

/// Looks up a category for a normalized extension (leading dot, any case).
#[must_use]
pub fn category_for_extension(extension: &str) -> Option<Category> {
    let normalized = extension.to_ascii_lowercase();
    CATEGORY_MAP
        .iter()
        .find(|(ext, _)| *ext == normalized)
        .map(|(_, category)| *category)
}

/// Extracts the lowercase extension suffix of a URL's path component.
///
/// The suffix runs from the last `.` in the path to its end, so a dot in a
/// non-final segment yields a suffix containing `/` that never matches the
/// category table. Returns `None` when the path has no dot at all.
#[must_use]
pub fn extension(url: &str) -> Option<String> {
    let path = url_path(url);
    let dot_index = path.rfind('.')?;
    Some(path[dot_index..].to_ascii_lowercase())
}

/// Classifies a URL as a downloadable file, or `None` for a non-file link.
///
/// The input is expected to be an absolute, percent-decoded URL; decoding
/// happens upstream so the extension of an encoded path is still visible.
#[must_use]
pub fn classify(url: &str) -> Option<Category> {
    category_for_extension(&extension(url)?)
}

/// Path component of a URL, tolerating inputs that no longer parse after
/// percent-decoding (for example paths containing literal spaces).
fn url_path(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.path().to_string();
    }

    // Manual fallback: strip scheme/authority, then query and fragment.
    let after_scheme = url
        .find("://")
        .and_then(|scheme_end| {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map(|path_start| &rest[path_start..])
        })
        .unwrap_or("");
    let end = after_scheme
        .find(['?', '#'])
        .unwrap_or(after_scheme.len());
    after_scheme[..end].to_string()
}

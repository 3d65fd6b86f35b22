//! Format identity: the [`Format`] enumeration and the classifier that derives
//! a canonical lowercase extension from an uploaded file's name or declared
//! content-type.
//!
//! The classifier works on plain extension strings (an upload may well be a
//! `gif` or `zip` that nothing here can convert), while [`Format`] names only
//! the formats that take part in the compatibility matrix.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIME type of a Word (OOXML) document.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Every format the converter can read or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Pdf,
    Docx,
    Txt,
    Md,
}

impl Format {
    /// Image formats in menu order.
    pub const IMAGES: [Format; 4] = [Format::Jpg, Format::Jpeg, Format::Png, Format::Webp];

    pub const ALL: [Format; 8] = [
        Format::Jpg,
        Format::Jpeg,
        Format::Png,
        Format::Webp,
        Format::Pdf,
        Format::Docx,
        Format::Txt,
        Format::Md,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Txt => "txt",
            Format::Md => "md",
        }
    }

    /// Parses a canonical (already lowercased) extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.extension() == ext)
    }

    pub fn is_image(self) -> bool {
        Format::IMAGES.contains(&self)
    }

    /// Human-readable label shown next to each choice in the format menu.
    pub fn label(self) -> String {
        match self {
            Format::Md => "Markdown (.md)".to_string(),
            Format::Txt => "Plain Text (.txt)".to_string(),
            Format::Docx => "Word (.docx)".to_string(),
            other => format!(
                "{} (.{})",
                other.extension().to_uppercase(),
                other.extension()
            ),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Trailing dot-segment of `name`, lowercased. Names without a dot (or
/// ending in one) have no extension.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Maps a declared content-type to an extension, ignoring any parameters
/// such as `; charset=utf-8`.
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if let Some(subtype) = essence.strip_prefix("image/") {
        if subtype.is_empty() {
            return None;
        }
        return Some(subtype.to_string());
    }
    match essence.as_str() {
        "application/pdf" => Some("pdf".to_string()),
        DOCX_CONTENT_TYPE => Some("docx".to_string()),
        s if s.starts_with("text/") => Some("txt".to_string()),
        _ => None,
    }
}

/// Canonical extension for an upload: the filename's extension when there is
/// one, otherwise whatever the content-type implies. Returns an empty string
/// when neither yields anything.
pub fn classify(name: Option<&str>, content_type: Option<&str>) -> String {
    if let Some(ext) = name.and_then(extension_of) {
        debug!(name = ?name, extension = %ext, "Classified upload by filename");
        return ext;
    }
    match content_type.and_then(extension_for_content_type) {
        Some(ext) => {
            debug!(content_type = ?content_type, extension = %ext, "Classified upload by content-type");
            ext
        }
        None => {
            debug!(name = ?name, content_type = ?content_type, "Upload format undeterminable");
            String::new()
        }
    }
}

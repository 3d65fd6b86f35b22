//! Error types.
//!
//! Three layers, each wrapping the one below:
//!
//! * [`DownloadError`]: fetching the source bytes failed.
//! * [`ConvertError`]: a converter backend rejected the file or reported an
//!   in-band failure.
//! * [`ConversionError`]: the user-facing taxonomy returned by the
//!   orchestrator. Every variant renders to a short message through
//!   [`ConversionError::user_message`]; the full detail goes to the log.

use thiserror::Error;

use crate::format::Format;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Server answered with a non-2xx status.
    #[error("Failed to download file: {code} {reason}")]
    Status { code: u16, reason: String },

    #[error("Download timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The body grew past the size limit while streaming.
    #[error("Downloaded body exceeded {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Transfer failed: {0}")]
    Transport(String),

    #[error("Failed to write downloaded file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Image conversion failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    /// The external converter could not be launched or exited unsuccessfully.
    #[error("Converter process failed: {0}")]
    Process(String),

    /// The external converter printed an `ERROR` marker.
    #[error("{0}")]
    ProcessReported(String),

    #[error("Text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Converter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Converter does not handle {source_format} -> {target}")]
    Unsupported { source_format: Format, target: Format },

    #[error("Converter task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unsupported source format '.{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Conversion session expired or unknown")]
    SessionExpired,

    #[error("Source is {size} bytes, limit is {limit}")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("Unsupported conversion pair .{source_ext} -> .{target_ext}")]
    UnsupportedConversion {
        source_ext: String,
        target_ext: String,
    },

    #[error(transparent)]
    DownloadFailure(#[from] DownloadError),

    #[error(transparent)]
    ConversionFailure(#[from] ConvertError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ConversionError {
    /// Short message suitable for showing to the user who asked for the
    /// conversion.
    pub fn user_message(&self) -> String {
        match self {
            ConversionError::UnsupportedFormat { extension } => {
                let shown = if extension.is_empty() {
                    "unknown"
                } else {
                    extension.as_str()
                };
                format!(
                    "Cannot convert .{shown} files.\nSupported: images, PDF <-> DOCX, TXT <-> MD"
                )
            }
            ConversionError::SessionExpired => {
                "Conversion session expired. Start a new conversion.".to_string()
            }
            ConversionError::SizeLimitExceeded { limit, .. } => {
                format!("File too large (max {}).", human_size(*limit))
            }
            ConversionError::UnsupportedConversion { .. }
            | ConversionError::DownloadFailure(_)
            | ConversionError::ConversionFailure(_) => format!("Conversion failed: {self}"),
            ConversionError::Unexpected(_) => "Unexpected error.".to_string(),
        }
    }
}

/// Whole MB from 1 MiB up, whole KB from 1 KiB up, bytes below that.
fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn too_large(limit: u64) -> String {
        ConversionError::SizeLimitExceeded {
            size: limit + 1,
            limit,
        }
        .user_message()
    }

    #[test]
    fn size_limit_message_uses_a_readable_unit() {
        assert_eq!(too_large(10 * 1024 * 1024), "File too large (max 10 MB).");
        assert_eq!(too_large(512 * 1024), "File too large (max 512 KB).");
        assert_eq!(too_large(100), "File too large (max 100 bytes).");
    }

    #[test]
    fn unknown_extension_is_shown_as_unknown() {
        let msg = ConversionError::UnsupportedFormat {
            extension: String::new(),
        }
        .user_message();
        assert!(msg.starts_with("Cannot convert .unknown files."));
    }
}

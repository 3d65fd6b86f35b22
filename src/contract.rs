//! # contract: the seams between the orchestrator and its collaborators
//!
//! Two traits are defined here:
//!
//! - [`Converter`]: one conversion backend. The router holds a table of these
//!   keyed by `(source, target)` format and never cares whether a backend runs
//!   in-process or shells out to an external program.
//! - [`Fetcher`]: retrieves the uploaded file's bytes into a scratch path.
//!
//! Both are annotated for `mockall` so tests can assert on exactly which
//! collaborator calls happen (for example that an oversized upload is never
//! fetched). Mocks are exported under the `test-export-mocks` feature for use
//! from integration tests.
//!
//! The remaining types are plain data flowing into and out of
//! [`crate::orchestrate::Orchestrator`].

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::error::{ConvertError, DownloadError};
use crate::format::Format;
use crate::job_store::JobId;

/// Handle to a file the user uploaded. Only metadata is held; the bytes stay
/// remote until a conversion is actually attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Where the bytes can be fetched from.
    pub url: String,
    /// Filename as declared by the uploader, if any.
    pub name: Option<String>,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared MIME type, if any.
    pub content_type: Option<String>,
}

/// One entry of the format menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatChoice {
    pub label: String,
    pub value: Format,
}

impl From<Format> for FormatChoice {
    fn from(value: Format) -> Self {
        Self {
            label: value.label(),
            value,
        }
    }
}

/// What the user is offered after a file is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub job_id: JobId,
    pub source_ext: String,
    pub choices: Vec<FormatChoice>,
}

impl Offer {
    pub fn targets(&self) -> Vec<Format> {
        self.choices.iter().map(|c| c.value).collect()
    }

    pub fn prompt(&self) -> String {
        format!("Detected .{}. Choose format:", self.source_ext)
    }
}

/// A finished conversion, read into memory so it outlives the scratch files.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A conversion backend.
///
/// Implementations must finish all work before returning `Ok`, and must
/// report every failure (including failures a subprocess only prints) as an
/// error.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert the file at `source` into `target`, writing it to `output`.
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError>;
}

/// Retrieves a remote file.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`, failing once more than `max_bytes` arrive.
    /// Returns the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path, max_bytes: u64) -> Result<u64, DownloadError>;
}

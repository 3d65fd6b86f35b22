//! Request lifecycle: accept an upload, hold it as a job, and convert it when
//! the user picks a target format.
//!
//! ```text
//! Received -> Classified -> AwaitingSelection -> Converting -> Succeeded | Failed
//! ```
//!
//! - [`Orchestrator::accept`] classifies the upload. Unsupported formats stop
//!   here and no job is created. Otherwise a job is stored and an [`Offer`]
//!   (the format menu) is returned.
//! - [`Orchestrator::select`] consumes the job, checks the declared size
//!   against the limit before any network I/O, downloads into a per-job
//!   scratch directory, routes the conversion, and reads the artifact back
//!   into memory.
//!
//! # Cleanup
//! Scratch files live in `<scratch_root>/<job_id>/`, named from the sanitized
//! upload filename. A drop guard removes them, the directory, and any
//! leftover job entry on every exit path, including errors and panics inside
//! a backend. Cleanup failures are logged at `debug` and otherwise ignored.
//!
//! # Error handling
//! Every failure on the conversion path comes back as a [`ConversionError`]
//! and is logged in full here; callers render it with
//! [`ConversionError::user_message`] (see [`reply_for`]).

use std::any::Any;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::contract::{ConvertedFile, Fetcher, FormatChoice, Offer, SourceFile};
use crate::download::HttpFetcher;
use crate::error::{ConvertError, ConversionError, DownloadError};
use crate::format::classify;
use crate::job_store::{ConversionJob, JobId, JobStore};
use crate::matrix::targets_for;
use crate::router::{Router, RouterError};

/// Fallback scratch name when an upload has no usable filename.
const FALLBACK_FILE_NAME: &str = "file";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("router table is inconsistent: {0}")]
    Router(#[from] RouterError),
    #[error("HTTP client could not be built: {0}")]
    Http(#[from] DownloadError),
    #[error("scratch directory unavailable: {0}")]
    Scratch(#[from] std::io::Error),
}

pub struct Orchestrator {
    jobs: JobStore,
    router: Router,
    fetcher: Arc<dyn Fetcher>,
    scratch_root: PathBuf,
    max_source_bytes: u64,
}

impl Orchestrator {
    pub fn new(
        jobs: JobStore,
        router: Router,
        fetcher: Arc<dyn Fetcher>,
        scratch_root: impl Into<PathBuf>,
        max_source_bytes: u64,
    ) -> Self {
        Self {
            jobs,
            router,
            fetcher,
            scratch_root: scratch_root.into(),
            max_source_bytes,
        }
    }

    /// Wires the default router, an HTTP fetcher and a fresh job store from
    /// `config`, creating the scratch root if needed.
    ///
    /// Must be called from within a tokio runtime (the job store spawns its
    /// sweep task).
    pub fn from_config(config: &ServiceConfig) -> Result<Self, SetupError> {
        config.prepare()?;
        let router =
            Router::with_defaults(config.office_converter.clone(), config.office_timeout())?;
        let fetcher = HttpFetcher::new(config.download_timeout())?;
        let jobs = JobStore::new(config.job_ttl(), config.sweep_interval());
        Ok(Self::new(
            jobs,
            router,
            Arc::new(fetcher),
            config.scratch_dir.clone(),
            config.max_source_bytes,
        ))
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Classifies an upload and, when it can be converted, stores a job and
    /// returns the format menu.
    pub fn accept(&self, source: SourceFile) -> Result<Offer, ConversionError> {
        let source_ext = classify(source.name.as_deref(), source.content_type.as_deref());
        let targets = targets_for(&source_ext);
        if source_ext.is_empty() || targets.is_empty() {
            warn!(
                name = ?source.name,
                content_type = ?source.content_type,
                extension = %source_ext,
                "[JOB] Rejected upload with unsupported format"
            );
            return Err(ConversionError::UnsupportedFormat {
                extension: source_ext,
            });
        }

        let job_id = self.jobs.create(source, source_ext.clone());
        let offer = Offer {
            job_id,
            source_ext,
            choices: targets.into_iter().map(FormatChoice::from).collect(),
        };
        info!(job_id = %job_id, source_ext = %offer.source_ext, targets = ?offer.targets(), "[JOB] Awaiting format selection");
        match serde_json::to_string(&offer) {
            Ok(json) => debug!(json = %json, "[JOB] Offer"),
            Err(e) => debug!(error = ?e, "[JOB] Failed to serialize offer"),
        }
        Ok(offer)
    }

    /// Runs the conversion the user selected for `job_id`.
    ///
    /// A job can be selected once; a second selection, or one after the TTL,
    /// yields [`ConversionError::SessionExpired`].
    pub async fn select(
        &self,
        job_id: &JobId,
        target_ext: &str,
    ) -> Result<ConvertedFile, ConversionError> {
        let Some(job) = self.jobs.consume(job_id) else {
            warn!(job_id = %job_id, "[JOB] Selection for unknown or expired job");
            return Err(ConversionError::SessionExpired);
        };
        let target_ext = target_ext.trim().to_lowercase();
        info!(job_id = %job_id, source_ext = %job.source_ext, target_ext = %target_ext, "[JOB] Converting");

        let scratch = Scratch::new(
            &self.jobs,
            &self.scratch_root,
            *job_id,
            job.source.name.as_deref(),
            &target_ext,
        );
        let outcome = AssertUnwindSafe(self.convert(&job, &target_ext, &scratch))
            .catch_unwind()
            .await;
        let result = outcome.unwrap_or_else(|panic| {
            Err(ConversionError::Unexpected(panic_message(panic.as_ref())))
        });

        match &result {
            Ok(file) => info!(
                job_id = %job_id,
                file_name = %file.file_name,
                bytes = file.content.len(),
                "[JOB] Conversion complete"
            ),
            Err(e) => error!(job_id = %job_id, error = ?e, "[JOB][ERROR] Conversion failed"),
        }
        drop(scratch);
        result
    }

    async fn convert(
        &self,
        job: &ConversionJob,
        target_ext: &str,
        scratch: &Scratch<'_>,
    ) -> Result<ConvertedFile, ConversionError> {
        let allowed = targets_for(&job.source_ext)
            .iter()
            .any(|t| t.extension() == target_ext);
        if !allowed {
            return Err(ConversionError::UnsupportedConversion {
                source_ext: job.source_ext.clone(),
                target_ext: target_ext.to_string(),
            });
        }

        if job.source.size > self.max_source_bytes {
            return Err(ConversionError::SizeLimitExceeded {
                size: job.source.size,
                limit: self.max_source_bytes,
            });
        }

        tokio::fs::create_dir_all(&scratch.dir).await.map_err(|e| {
            ConversionError::Unexpected(format!(
                "could not create scratch directory {}: {e}",
                scratch.dir.display()
            ))
        })?;

        self.fetcher
            .fetch(&job.source.url, &scratch.source, self.max_source_bytes)
            .await?;

        self.router
            .route(&scratch.source, &job.source_ext, target_ext, &scratch.output)
            .await?;

        let content = tokio::fs::read(&scratch.output)
            .await
            .map_err(|e| ConversionError::ConversionFailure(ConvertError::Io(e)))?;
        Ok(ConvertedFile {
            file_name: scratch.output_name.clone(),
            content,
        })
    }
}

/// User-visible reply for the outcome of a selection.
pub fn reply_for(result: &Result<ConvertedFile, ConversionError>) -> String {
    match result {
        Ok(_) => "Conversion complete!".to_string(),
        Err(e) => e.user_message(),
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`, so the name is
/// safe to join onto a path and to pass to an external program.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

/// `<stem>.<target_ext>` for an already sanitized source name.
pub fn output_file_name(sanitized: &str, target_ext: &str) -> String {
    let stem = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem,
        _ => sanitized,
    };
    let stem = if stem.is_empty() {
        FALLBACK_FILE_NAME
    } else {
        stem
    };
    let name = format!("{stem}.{target_ext}");
    if name == sanitized {
        format!("converted_{name}")
    } else {
        name
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "conversion task panicked".to_string()
    }
}

/// Scratch paths of one conversion attempt; removes them, and the job entry,
/// when dropped.
struct Scratch<'a> {
    jobs: &'a JobStore,
    job_id: JobId,
    dir: PathBuf,
    source: PathBuf,
    output: PathBuf,
    output_name: String,
}

impl<'a> Scratch<'a> {
    fn new(
        jobs: &'a JobStore,
        root: &Path,
        job_id: JobId,
        name: Option<&str>,
        target_ext: &str,
    ) -> Self {
        let source_name = sanitize_filename(name.unwrap_or(FALLBACK_FILE_NAME));
        let output_name = output_file_name(&source_name, target_ext);
        let dir = root.join(job_id.to_string());
        Self {
            jobs,
            job_id,
            source: dir.join(&source_name),
            output: dir.join(&output_name),
            dir,
            output_name,
        }
    }
}

impl Drop for Scratch<'_> {
    // Drop cannot await: removal blocks the worker briefly on one small job dir.
    fn drop(&mut self) {
        for path in [&self.source, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed scratch file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => debug!(error = ?e, path = %path.display(), "Failed to remove scratch file"),
            }
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!(error = ?e, path = %self.dir.display(), "Failed to remove scratch directory"),
        }
        if self.jobs.remove(&self.job_id) {
            debug!(job_id = %self.job_id, "Removed job during cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("a\"; rm -rf ~.md"), "a___rm_-rf__.md");
        assert_eq!(sanitize_filename("résumé.docx"), "r_sum_.docx");
    }

    #[test]
    fn sanitize_never_yields_a_directory_reference() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("."), "file");
        assert_eq!(sanitize_filename(".."), "file");
    }

    #[test]
    fn output_name_swaps_extension() {
        assert_eq!(output_file_name("photo.jpg", "png"), "photo.png");
        assert_eq!(output_file_name("archive.tar.md", "txt"), "archive.tar.txt");
        assert_eq!(output_file_name("noext", "md"), "noext.md");
        assert_eq!(output_file_name(".png", "jpeg"), "file.jpeg");
    }

    #[test]
    fn output_name_never_collides_with_source() {
        assert_eq!(output_file_name("notes.md", "md"), "converted_notes.md");
    }

    #[test]
    fn panic_payloads_are_described() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::backend::ExternalCommand;

/// Largest upload accepted for conversion, checked before any download.
pub const MAX_SOURCE_BYTES: u64 = 10 * 1024 * 1024;

/// Name of the scratch directory created under the platform temp root.
pub const SCRATCH_DIR_NAME: &str = "file-converter";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub scratch_dir: PathBuf,
    pub max_source_bytes: u64,
    pub job_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub download_timeout_secs: u64,
    pub office_timeout_secs: u64,
    pub office_converter: ExternalCommand,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join(SCRATCH_DIR_NAME),
            max_source_bytes: MAX_SOURCE_BYTES,
            job_ttl_secs: crate::job_store::DEFAULT_JOB_TTL.as_secs(),
            sweep_interval_secs: crate::job_store::DEFAULT_SWEEP_INTERVAL.as_secs(),
            download_timeout_secs: crate::download::DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
            office_timeout_secs: 120,
            office_converter: ExternalCommand::default(),
        }
    }
}

impl ServiceConfig {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn office_timeout(&self) -> Duration {
        Duration::from_secs(self.office_timeout_secs)
    }

    /// Creates the scratch root if it does not exist yet.
    pub fn prepare(&self) -> std::io::Result<()> {
        if self.scratch_dir.exists() {
            return Ok(());
        }
        match std::fs::create_dir_all(&self.scratch_dir) {
            Ok(()) => {
                info!(path = %self.scratch_dir.display(), "Created scratch directory");
                Ok(())
            }
            Err(e) => {
                error!(error = ?e, path = %self.scratch_dir.display(), "Failed to create scratch directory");
                Err(e)
            }
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            scratch_dir = %self.scratch_dir.display(),
            max_source_bytes = self.max_source_bytes,
            job_ttl_secs = self.job_ttl_secs,
            office_program = %self.office_converter.program,
            "Loaded ServiceConfig"
        );
        debug!(?self, "ServiceConfig loaded (full debug)");
    }
}

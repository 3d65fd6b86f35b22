//! In-memory store of pending conversion jobs.
//!
//! A job links an accepted upload to the user's later choice of target
//! format. The store hands out opaque [`JobId`]s, lets each job be consumed
//! exactly once, and runs a background sweep that drops jobs older than the
//! configured TTL. The sweep task belongs to the store: it starts in
//! [`JobStore::new`] and stops on [`JobStore::shutdown`] or drop.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::contract::SourceFile;

/// Jobs older than this are unreachable.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(15 * 60);
/// How often the background sweep runs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

/// A pending conversion waiting for the user's format choice.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: JobId,
    pub source: SourceFile,
    pub source_ext: String,
    pub created_at: Instant,
}

struct Jobs {
    entries: Mutex<HashMap<JobId, ConversionJob>>,
    ttl: Duration,
}

impl Jobs {
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, ConversionJob>> {
        // Critical sections are single map operations; a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, job: &ConversionJob, now: Instant) -> bool {
        now.duration_since(job.created_at) > self.ttl
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, job| !self.is_expired(job, now));
        before - entries.len()
    }
}

pub struct JobStore {
    jobs: Arc<Jobs>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl JobStore {
    /// Creates an empty store and spawns its sweep task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let jobs = Arc::new(Jobs {
            entries: Mutex::new(HashMap::new()),
            ttl,
        });
        let sweeper = tokio::spawn(run_sweeper(Arc::downgrade(&jobs), sweep_interval));
        info!(
            ttl_secs = ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "Job store started"
        );
        Self {
            jobs,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Registers a new pending job and returns its id.
    pub fn create(&self, source: SourceFile, source_ext: String) -> JobId {
        let id = JobId::new();
        let job = ConversionJob {
            id,
            source,
            source_ext,
            created_at: Instant::now(),
        };
        debug!(job_id = %id, source_ext = %job.source_ext, "Created job");
        self.jobs.lock().insert(id, job);
        id
    }

    /// Removes and returns the job, unless it is unknown, already consumed,
    /// or older than the TTL. Only one caller can ever receive a given job.
    pub fn consume(&self, id: &JobId) -> Option<ConversionJob> {
        let job = self.jobs.lock().remove(id)?;
        if self.jobs.is_expired(&job, Instant::now()) {
            debug!(job_id = %id, "Job expired before it was consumed");
            return None;
        }
        debug!(job_id = %id, "Consumed job");
        Some(job)
    }

    /// Drops the job if it is still present. Returns whether anything was
    /// removed.
    pub fn remove(&self, id: &JobId) -> bool {
        self.jobs.lock().remove(id).is_some()
    }

    /// Drops every job older than the TTL, returning how many went.
    pub fn sweep_expired(&self) -> usize {
        self.jobs.sweep()
    }

    /// Whether an entry (expired or not) is still held for `id`.
    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.lock().contains_key(id)
    }

    /// Number of held entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.jobs.ttl
    }

    /// Stops the sweep task. Held jobs stay reachable until they expire.
    pub fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Job store sweeper stopped");
        }
    }
}

impl Drop for JobStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_sweeper(jobs: Weak<Jobs>, every: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(jobs) = jobs.upgrade() else {
            break;
        };
        let removed = jobs.sweep();
        if removed > 0 {
            info!(removed, "Swept expired jobs");
        }
    }
}

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use caption_core::{Job, JobEvent, JobId, JobState, JobStatus, RetryDecision, RetryPolicy};
use chrono::Utc;
use job_logging::{job_debug, job_error, job_info, job_warn};
use thiserror::Error;

use crate::pool::panic_message;
use crate::{
    ArtifactStore, ConfigError, ExtractError, Extraction, Extractor, FailureKind, JobStore,
    PoolError, SchedulerConfig, StatusCache, WorkerPool,
};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid scheduler configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] PoolError),
}

/// Point-in-time view of the scheduler's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Job bodies waiting for a free worker.
    pub queued: usize,
}

/// State shared between the scheduler handle and the job bodies it dispatches.
struct Shared {
    jobs: JobStore,
    cache: StatusCache,
    extractor: Arc<dyn Extractor>,
    artifacts: Arc<dyn ArtifactStore>,
    policy: RetryPolicy,
}

/// Accepts caption extraction jobs and answers status queries.
///
/// Construct one per process and share it (e.g. behind an `Arc`); every
/// method takes `&self` and is safe to call from any thread.
pub struct Scheduler {
    shared: Arc<Shared>,
    pool: WorkerPool,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        extractor: Arc<dyn Extractor>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let pool = WorkerPool::new(config.max_concurrent_tasks)?;
        let shared = Arc::new(Shared {
            jobs: JobStore::new(),
            cache: StatusCache::with_capacity_limit(config.max_retained_terminal),
            extractor,
            artifacts,
            policy: config.retry_policy(),
        });

        job_info!(
            "Scheduler started: max_concurrent_tasks={} max_retries={} retry_delay={:?}",
            config.max_concurrent_tasks,
            shared.policy.max_attempts,
            shared.policy.backoff
        );

        Ok(Self {
            shared,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Registers a job for `url` and queues it; returns without waiting.
    pub fn submit(&self, url: impl Into<String>) -> JobId {
        let url = url.into();
        let job_id = loop {
            let candidate = JobId::generate();
            let job = Job::new(
                candidate.clone(),
                url.clone(),
                self.shared.policy.max_attempts,
                Utc::now(),
            );
            if self.shared.jobs.insert_new(job) {
                break candidate;
            }
        };
        job_info!("Submitted job {} for {}", job_id, url);

        let shared = Arc::clone(&self.shared);
        let task_id = job_id.clone();
        if let Err(err) = self.pool.submit(move || run_job(&shared, &task_id, &url)) {
            job_error!("Could not queue job {}: {}", job_id, err);
            self.shared.complete(
                &job_id,
                JobEvent::Failed {
                    message: format!("worker pool unavailable: {err}"),
                },
            );
        }
        job_id
    }

    /// Current status of `job_id`; never blocks on extraction.
    ///
    /// Resolution order: cached terminal status, then an artifact named after
    /// the job, then the live record, then `NotFound`. Terminal answers are
    /// cached, so repeated calls return identical payloads.
    pub fn get_status(&self, job_id: &str) -> JobStatus {
        if let Some(status) = self.shared.cache.get(job_id) {
            return (*status).clone();
        }

        if let Some(status) = self.shared.reconcile(job_id) {
            return status;
        }

        match self.shared.jobs.get(job_id) {
            Some(job) if job.is_terminal() => self.shared.finalize(job.id(), JobStatus::from(&job)),
            Some(job) => JobStatus::from(&job),
            None => {
                job_debug!("Status requested for unknown job {}", job_id);
                JobStatus::NotFound
            }
        }
    }

    /// Attempt count and timestamps of a live record, for diagnostics.
    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.shared.jobs.get(job_id)
    }

    pub fn stats(&self) -> SchedulerStats {
        let counts = self.shared.jobs.count_by_state();
        let count = |state: JobState| counts.get(&state).copied().unwrap_or(0);
        SchedulerStats {
            pending: count(JobState::Pending),
            running: count(JobState::Running),
            succeeded: count(JobState::Succeeded),
            failed: count(JobState::Failed),
            queued: self.pool.queued(),
        }
    }
}

impl Shared {
    /// Looks for a durable artifact named after `job_id` and, if one is
    /// readable and non-empty, finalizes the job as completed.
    fn reconcile(&self, job_id: &str) -> Option<JobStatus> {
        if !is_probeable(job_id) {
            return None;
        }

        let entries = match self.artifacts.list_matching(job_id) {
            Ok(entries) => entries,
            Err(err) => {
                job_warn!("Artifact probe for job {} failed: {}", job_id, err);
                return None;
            }
        };

        for entry in entries {
            match self.artifacts.read(&entry.path) {
                Ok(content) if has_content(&content) => {
                    job_info!(
                        "Reconciled job {} from artifact {}",
                        job_id,
                        entry.path.display()
                    );
                    let status = JobStatus::Completed {
                        content,
                        path: entry.path.display().to_string(),
                    };
                    return Some(self.finalize(&JobId::from(job_id), status));
                }
                Ok(_) => job_debug!("Ignoring empty artifact {}", entry.path.display()),
                Err(err) => job_warn!(
                    "Unreadable artifact {} for job {}: {}",
                    entry.path.display(),
                    job_id,
                    err
                ),
            }
        }
        None
    }

    fn finalize(&self, job_id: &JobId, status: JobStatus) -> JobStatus {
        let finalized = self.cache.finalize(job_id, status);
        for evicted in &finalized.evicted {
            self.jobs.remove(evicted.as_str());
            job_debug!("Evicted terminal job {}", evicted);
        }
        (*finalized.status).clone()
    }

    /// Records a terminal event and publishes the resulting status.
    fn complete(&self, job_id: &JobId, event: JobEvent) {
        match self.jobs.update(job_id.as_str(), event) {
            Ok(job) => {
                self.finalize(job_id, JobStatus::from(&job));
            }
            Err(err) => job_warn!("Dropping completion of job {}: {}", job_id, err),
        }
    }
}

/// Job body: attempts extraction until it succeeds or the policy gives up.
fn run_job(shared: &Shared, job_id: &JobId, url: &str) {
    let _context = job_logging::enter_job(job_id.as_str());

    loop {
        let job = match shared.jobs.update(job_id.as_str(), JobEvent::AttemptStarted) {
            Ok(job) => job,
            Err(err) => {
                job_warn!("Stopping: {}", err);
                return;
            }
        };
        let attempt = job.attempt_count();
        job_debug!("Attempt {}/{} for {}", attempt, job.max_attempts(), url);

        let failure = match attempt_extraction(shared.extractor.as_ref(), url, job_id) {
            Ok(Extraction { content, path }) => {
                job_info!("Extracted captions to {}", path.display());
                shared.complete(
                    job_id,
                    JobEvent::Succeeded {
                        content,
                        path: path.display().to_string(),
                    },
                );
                return;
            }
            Err(err) => err,
        };

        job_warn!("Attempt {} failed: {}", attempt, failure);
        match shared.policy.after_failure(attempt) {
            RetryDecision::RetryAfter(delay) => thread::sleep(delay),
            RetryDecision::GiveUp => {
                job_error!("Giving up after {} attempts: {}", attempt, failure.message);
                shared.complete(
                    job_id,
                    JobEvent::Failed {
                        message: failure.message,
                    },
                );
                return;
            }
        }
    }
}

/// One extractor invocation; panics and empty results become transient errors.
fn attempt_extraction(
    extractor: &dyn Extractor,
    url: &str,
    job_id: &JobId,
) -> Result<Extraction, ExtractError> {
    let extraction = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(url, job_id)))
        .map_err(|payload| {
            ExtractError::new(
                FailureKind::Panicked,
                format!("extractor panicked: {}", panic_message(&*payload)),
            )
        })??;

    if !has_content(&extraction.content) {
        return Err(ExtractError::new(
            FailureKind::EmptyContent,
            "Extracted caption content is empty",
        ));
    }
    if extraction.path.as_os_str().is_empty() {
        return Err(ExtractError::new(
            FailureKind::MissingPath,
            "Subtitle path not found",
        ));
    }
    Ok(extraction)
}

fn has_content(content: &str) -> bool {
    !content.trim().is_empty()
}

/// Identifiers that cannot name a file in the artifact directory are never probed.
fn is_probeable(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id != "."
        && job_id != ".."
        && !job_id.contains(&['/', '\\', '\0'][..])
}

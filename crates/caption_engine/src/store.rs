use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use caption_core::{apply, Job, JobEvent, JobId, JobState, JobStatus, TransitionError};
use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("no live record for job {0}")]
    Unknown(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Live job records keyed by identifier.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `job` unless its identifier is already taken.
    pub fn insert_new(&self, job: Job) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.entry(job.id().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(job);
                true
            }
        }
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(job_id).cloned()
    }

    /// Applies `event` under the write lock and returns the updated record.
    pub fn update(&self, job_id: &str, event: JobEvent) -> Result<Job, UpdateError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| UpdateError::Unknown(job_id.to_string()))?;
        apply(job, event, Utc::now())?;
        Ok(job.clone())
    }

    pub fn remove(&self, job_id: &str) -> Option<Job> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.remove(job_id)
    }

    /// Number of live records in each state.
    pub fn count_by_state(&self) -> HashMap<JobState, usize> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts = HashMap::new();
        for job in jobs.values() {
            *counts.entry(job.state()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    /// The cached payload; the earlier one if another writer won the race.
    pub status: Arc<JobStatus>,
    /// Identifiers dropped to honour the retention cap.
    pub evicted: Vec<JobId>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<JobId, Arc<JobStatus>>,
    order: VecDeque<JobId>,
}

/// Write-once cache of terminal statuses.
#[derive(Debug, Default)]
pub struct StatusCache {
    inner: RwLock<CacheInner>,
    capacity: Option<usize>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that keeps at most `capacity` statuses, evicting the oldest first.
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            inner: RwLock::default(),
            capacity,
        }
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<JobStatus>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(job_id).cloned()
    }

    /// Publishes a terminal status; the first writer for an identifier wins.
    pub fn finalize(&self, job_id: &JobId, status: JobStatus) -> Finalized {
        debug_assert!(status.is_terminal(), "only terminal statuses are cached");

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.entries.get(job_id) {
            return Finalized {
                status: Arc::clone(existing),
                evicted: Vec::new(),
            };
        }

        let status = Arc::new(status);
        inner.entries.insert(job_id.clone(), Arc::clone(&status));
        inner.order.push_back(job_id.clone());

        let mut evicted = Vec::new();
        if let Some(capacity) = self.capacity {
            while inner.order.len() > capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                evicted.push(oldest);
            }
        }

        Finalized { status, evicted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn failed(message: &str) -> JobStatus {
        JobStatus::Failed {
            message: message.to_string(),
        }
    }

    #[test]
    fn first_finalize_wins() {
        let cache = StatusCache::new();
        let id = JobId::from("a");
        let first = cache.finalize(&id, failed("first"));
        let second = cache.finalize(&id, failed("second"));
        assert_eq!(*first.status, failed("first"));
        assert_eq!(*second.status, failed("first"));
        assert_eq!(*cache.get("a").unwrap(), failed("first"));
    }

    #[test]
    fn racing_finalizers_agree() {
        let cache = Arc::new(StatusCache::new());
        let id = JobId::from("race");
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                let id = id.clone();
                thread::spawn(move || cache.finalize(&id, failed(&format!("writer {n}"))).status)
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = cache.get("race").unwrap();
        assert!(results.iter().all(|status| **status == *cached));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = StatusCache::with_capacity_limit(Some(2));
        cache.finalize(&JobId::from("a"), failed("a"));
        cache.finalize(&JobId::from("b"), failed("b"));
        let third = cache.finalize(&JobId::from("c"), failed("c"));
        assert_eq!(third.evicted, vec![JobId::from("a")]);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn insert_new_rejects_duplicate_ids() {
        let store = JobStore::new();
        let job = Job::new(JobId::from("dup"), "u", 3, Utc::now());
        assert!(store.insert_new(job.clone()));
        assert!(!store.insert_new(job));
        assert_eq!(store.count_by_state().get(&JobState::Pending), Some(&1));
    }

    #[test]
    fn update_of_unknown_job_fails() {
        let store = JobStore::new();
        let err = store.update("missing", JobEvent::AttemptStarted).unwrap_err();
        assert_eq!(err, UpdateError::Unknown("missing".to_string()));
    }
}

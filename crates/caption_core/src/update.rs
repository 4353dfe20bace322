use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Job, JobOutcome, JobState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A worker is about to invoke the extractor.
    AttemptStarted,
    Succeeded { content: String, path: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job already reached terminal state {0:?}")]
    AlreadyTerminal(JobState),
    #[error("job cannot succeed before an attempt has started")]
    NotStarted,
    #[error("attempt limit of {0} reached")]
    AttemptLimitReached(u32),
}

/// Applies a lifecycle event to a job record.
///
/// Allowed transitions are `Pending -> Running`, `Running -> Running` (next
/// attempt), `Running -> Succeeded` and `{Pending, Running} -> Failed`. A
/// rejected event leaves the record untouched.
pub fn apply(job: &mut Job, event: JobEvent, at: DateTime<Utc>) -> Result<(), TransitionError> {
    if job.state.is_terminal() {
        return Err(TransitionError::AlreadyTerminal(job.state));
    }

    match event {
        JobEvent::AttemptStarted => {
            if job.attempt_count >= job.max_attempts {
                return Err(TransitionError::AttemptLimitReached(job.max_attempts));
            }
            job.attempt_count += 1;
            if job.state == JobState::Pending {
                job.state = JobState::Running;
                job.started_at = Some(at);
            }
        }
        JobEvent::Succeeded { content, path } => {
            if job.state != JobState::Running {
                return Err(TransitionError::NotStarted);
            }
            job.outcome = Some(JobOutcome::Succeeded { content, path });
            job.state = JobState::Succeeded;
            job.completed_at = Some(at);
        }
        JobEvent::Failed { message } => {
            job.outcome = Some(JobOutcome::Failed { message });
            job.state = JobState::Failed;
            job.completed_at = Some(at);
        }
    }

    Ok(())
}

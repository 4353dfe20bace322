//! Caption core: job model, lifecycle state machine and status payloads.
mod job;
mod retry;
mod status;
mod update;

pub use job::{Job, JobId, JobOutcome, JobState};
pub use retry::{RetryDecision, RetryPolicy};
pub use status::JobStatus;
pub use update::{apply, JobEvent, TransitionError};

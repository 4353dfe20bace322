use serde::{Deserialize, Serialize};

use crate::{Job, JobOutcome, JobState};

/// Caller-facing status payload.
///
/// Serializes as `{"status": "...", ...}` with `content`/`path` for completed
/// jobs and `message` for failed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed { content: String, path: String },
    Failed { message: String },
    NotFound,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
            JobStatus::NotFound => "not_found",
        }
    }
}

impl From<&JobOutcome> for JobStatus {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Succeeded { content, path } => JobStatus::Completed {
                content: content.clone(),
                path: path.clone(),
            },
            JobOutcome::Failed { message } => JobStatus::Failed {
                message: message.clone(),
            },
        }
    }
}

impl From<&Job> for JobStatus {
    fn from(job: &Job) -> Self {
        match (job.state(), job.outcome()) {
            (JobState::Pending, _) => JobStatus::Pending,
            (JobState::Running, _) => JobStatus::Running,
            (_, Some(outcome)) => JobStatus::from(outcome),
            // Terminal states always carry an outcome; see `apply`.
            (JobState::Succeeded | JobState::Failed, None) => JobStatus::Failed {
                message: "terminal job without outcome".to_string(),
            },
        }
    }
}

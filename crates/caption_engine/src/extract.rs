use caption_core::JobId;

use crate::{ExtractError, Extraction};

/// Pulls captions for `url`, storing them under a name derived from `job_id`.
///
/// Implementations may block for the duration of a network operation and are
/// responsible for bounding it with their own timeout.
pub trait Extractor: Send + Sync {
    fn extract(&self, url: &str, job_id: &JobId) -> Result<Extraction, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&str, &JobId) -> Result<Extraction, ExtractError> + Send + Sync,
{
    fn extract(&self, url: &str, job_id: &JobId) -> Result<Extraction, ExtractError> {
        self(url, job_id)
    }
}

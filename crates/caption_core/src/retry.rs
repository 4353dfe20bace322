use std::time::Duration;

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// Decision after attempt number `attempt` (1-based) failed.
    pub fn after_failure(&self, attempt: u32) -> RetryDecision {
        if attempt < self.max_attempts {
            RetryDecision::RetryAfter(self.backoff)
        } else {
            RetryDecision::GiveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryDecision, RetryPolicy};
    use std::time::Duration;

    #[test]
    fn retries_until_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.after_failure(1),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.after_failure(2),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(policy.after_failure(3), RetryDecision::GiveUp);
    }

    #[test]
    fn single_attempt_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
        };
        assert_eq!(policy.after_failure(1), RetryDecision::GiveUp);
    }
}

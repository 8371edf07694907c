use std::time::Duration;

use crate::ReplayError;

/// Bounded retry of transient publish failures with a fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per record, including the first one. At least 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

    pub fn new(max_attempts: u32, backoff: Duration) -> Result<Self, ReplayError> {
        if max_attempts == 0 {
            return Err(ReplayError::Config("retry max_attempts must be at least 1".into()));
        }
        Ok(Self { max_attempts, backoff })
    }

    /// No retries: the first transient failure aborts the run.
    pub fn none() -> Self {
        Self { max_attempts: 1, backoff: Duration::ZERO }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_cap_is_inclusive() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10)).unwrap();
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }

    #[test]
    fn none_never_retries() {
        assert!(!RetryPolicy::none().allows_retry_after(1));
    }

    #[test]
    fn zero_attempts_rejected() {
        assert!(matches!(RetryPolicy::new(0, Duration::ZERO), Err(ReplayError::Config(_))));
    }
}

use std::time::Duration;

use crate::ReplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    MaxCountReached,
    SourceExhausted,
    Aborted,
}

impl TerminationReason {
    pub fn is_success(&self) -> bool {
        !matches!(self, TerminationReason::Aborted)
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::MaxCountReached => f.write_str("max count reached"),
            TerminationReason::SourceExhausted => f.write_str("source exhausted"),
            TerminationReason::Aborted => f.write_str("aborted"),
        }
    }
}

/// Outcome of one replay run. Partial progress is always reported,
/// including on abort.
#[derive(Debug)]
pub struct ReplaySummary {
    /// Records confirmed by the publisher.
    pub published: u64,
    /// Malformed lines skipped under `MalformedPolicy::Skip`.
    pub skipped: u64,
    pub reason: TerminationReason,
    /// Cause of the abort; `None` unless `reason == Aborted`.
    pub error: Option<ReplayError>,
    pub elapsed: Duration,
}

impl ReplaySummary {
    pub fn is_success(&self) -> bool {
        self.reason.is_success()
    }

    pub fn exit_code(&self) -> i32 {
        self.reason.exit_code()
    }

    /// Records per second over the whole run.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.published as f64 / secs } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(TerminationReason::MaxCountReached.exit_code(), 0);
        assert_eq!(TerminationReason::SourceExhausted.exit_code(), 0);
        assert_eq!(TerminationReason::Aborted.exit_code(), 1);
    }
}

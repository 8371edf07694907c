use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{Pacer, ReplayError, RetryPolicy};

pub const DEFAULT_MAX_COUNT: u64 = 1000;

/// What to do with a line that is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// End the run with `Aborted`.
    #[default]
    Abort,
    /// Log a warning, count the line as skipped, continue.
    Skip,
}

/// Immutable run configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub path: PathBuf,
    pub max_count: u64,
    /// `None` or zero = unpaced.
    pub interval: Option<Duration>,
    pub verbose: bool,
    pub malformed: MalformedPolicy,
    pub retry: RetryPolicy,
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_count: DEFAULT_MAX_COUNT,
            interval: None,
            verbose: false,
            malformed: MalformedPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.interval)
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.path.as_os_str().is_empty() {
            return Err(ReplayError::Config("event file path is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReplayError::Config("retry max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

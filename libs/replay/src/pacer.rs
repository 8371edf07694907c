use std::time::Duration;

/// Minimum delay between successive publishes.
///
/// The delay is not compensated for publish latency: the effective
/// per-record period is `interval + publish latency`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    interval: Option<Duration>,
}

impl Pacer {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
        }
    }

    pub fn is_paced(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns immediately when unpaced.
    pub async fn wait(&self) {
        if let Some(interval) = self.interval {
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn zero_interval_means_unpaced() {
        assert!(!Pacer::new(Some(Duration::ZERO)).is_paced());
        assert!(!Pacer::new(None).is_paced());
        assert!(Pacer::new(Some(Duration::from_millis(5))).is_paced());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_exactly_the_interval() {
        let pacer = Pacer::new(Some(Duration::from_millis(250)));
        let start = Instant::now();
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn unpaced_wait_returns_immediately() {
        let start = Instant::now();
        Pacer::new(None).wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

//! Engine configuration

use std::time::Duration;

/// Default outbound queue capacity (~1 second of frames at 15 fps)
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Engine configuration options
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Outbound queue capacity in frames
    pub queue_capacity: usize,

    /// Interval between bandwidth estimator ticks
    pub stats_interval: Duration,

    /// Grace period for the worker to wind down on `stop()`
    pub drain_timeout: Duration,

    /// Link send latency above which a tick counts as congested
    pub send_latency_threshold: Duration,

    /// Initial encoder bitrate hint (kbps)
    pub initial_bitrate_kbps: u32,

    /// Lowest bitrate the congestion response will back off to (kbps)
    pub min_bitrate_kbps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stats_interval: Duration::from_secs(1),
            drain_timeout: Duration::from_millis(500),
            send_latency_threshold: Duration::from_millis(250),
            initial_bitrate_kbps: 4000,
            min_bitrate_kbps: 500,
        }
    }
}

impl EngineConfig {
    /// Set the queue capacity (clamped to at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the bandwidth estimator tick interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the `stop()` grace period
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set the send latency congestion threshold
    pub fn send_latency_threshold(mut self, threshold: Duration) -> Self {
        self.send_latency_threshold = threshold;
        self
    }

    /// Set the initial encoder bitrate hint
    pub fn initial_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.initial_bitrate_kbps = kbps;
        self
    }

    /// Set the bitrate floor for congestion backoff
    pub fn min_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.min_bitrate_kbps = kbps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.stats_interval, Duration::from_secs(1));
        assert_eq!(config.initial_bitrate_kbps, 4000);
        assert_eq!(config.min_bitrate_kbps, 500);
    }

    #[test]
    fn test_builder_chaining() {
        let config = EngineConfig::default()
            .queue_capacity(8)
            .stats_interval(Duration::from_millis(500))
            .drain_timeout(Duration::from_secs(1))
            .send_latency_threshold(Duration::from_millis(100))
            .initial_bitrate_kbps(2500)
            .min_bitrate_kbps(300);

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.stats_interval, Duration::from_millis(500));
        assert_eq!(config.drain_timeout, Duration::from_secs(1));
        assert_eq!(config.send_latency_threshold, Duration::from_millis(100));
        assert_eq!(config.initial_bitrate_kbps, 2500);
        assert_eq!(config.min_bitrate_kbps, 300);
    }

    #[test]
    fn test_queue_capacity_clamped() {
        let config = EngineConfig::default().queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}

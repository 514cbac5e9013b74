//! Rolling performance observation
//!
//! A read-only observer layered over successive [`StreamStats`] snapshots.
//! It derives windowed fps, bitrate, and drop ratio, and classifies stream
//! health. It never feeds back into the transport engine; bitrate
//! adaptation is driven solely by the engine's congestion response.

use super::metrics::{bitrate_kbps, StreamStats};

/// Coarse stream health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamHealth {
    /// Frame rate near target, negligible drops
    Good,
    /// Noticeable drops or reduced frame rate
    Degraded,
    /// Heavy drops or frame rate collapse
    Poor,
}

/// Metrics derived over one observation window
#[derive(Debug, Clone, Copy)]
pub struct PerformanceReport {
    /// Sent frames per second in the window
    pub fps: f64,
    /// Outgoing bitrate in the window (kbps)
    pub bitrate_kbps: u64,
    /// Dropped / attempted in the window (0.0 when nothing was attempted)
    pub drop_ratio: f64,
    /// Health classification
    pub health: StreamHealth,
}

/// Windowed observer over engine stats snapshots
///
/// Feed it snapshots at any cadence; each call reports on the window since
/// the previous one. Windows are measured with the snapshots' own session
/// clock, so the monitor needs no clock of its own.
#[derive(Debug)]
pub struct PerformanceMonitor {
    target_fps: f64,
    previous: Option<StreamStats>,
}

impl PerformanceMonitor {
    /// Degraded above this drop ratio, poor above four times it
    const DROP_RATIO_DEGRADED: f64 = 0.05;

    /// Create a monitor for the given target frame rate
    pub fn new(target_fps: f64) -> Self {
        Self {
            target_fps,
            previous: None,
        }
    }

    /// Observe a snapshot; returns a report once a prior snapshot exists
    ///
    /// Returns `None` on the first call and for an empty or rewound window
    /// (a rewind happens when the engine was restarted between snapshots).
    pub fn observe(&mut self, stats: StreamStats) -> Option<PerformanceReport> {
        let previous = self.previous.replace(stats);
        let previous = previous?;

        if stats.elapsed <= previous.elapsed || stats.frames_sent < previous.frames_sent {
            return None;
        }

        let window = stats.elapsed - previous.elapsed;
        let sent = stats.frames_sent - previous.frames_sent;
        let bytes = stats.bytes_sent - previous.bytes_sent;
        let dropped = stats.frames_dropped.saturating_sub(previous.frames_dropped);
        let attempted = sent + dropped;

        let fps = sent as f64 / window.as_secs_f64();
        let drop_ratio = if attempted > 0 {
            dropped as f64 / attempted as f64
        } else {
            0.0
        };

        Some(PerformanceReport {
            fps,
            bitrate_kbps: bitrate_kbps(bytes, window),
            drop_ratio,
            health: self.classify(fps, drop_ratio),
        })
    }

    /// Forget the previous snapshot (call across engine restarts)
    pub fn reset(&mut self) {
        self.previous = None;
    }

    fn classify(&self, fps: f64, drop_ratio: f64) -> StreamHealth {
        if drop_ratio > Self::DROP_RATIO_DEGRADED * 4.0 || fps < self.target_fps * 0.5 {
            StreamHealth::Poor
        } else if drop_ratio > Self::DROP_RATIO_DEGRADED || fps < self.target_fps * 0.8 {
            StreamHealth::Degraded
        } else {
            StreamHealth::Good
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn snapshot(secs: u64, sent: u64, bytes: u64, dropped: u64) -> StreamStats {
        StreamStats {
            frames_sent: sent,
            bytes_sent: bytes,
            frames_dropped: dropped,
            elapsed: Duration::from_secs(secs),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_observation_yields_nothing() {
        let mut monitor = PerformanceMonitor::new(30.0);
        assert!(monitor.observe(snapshot(1, 30, 500_000, 0)).is_none());
    }

    #[test]
    fn test_good_window() {
        let mut monitor = PerformanceMonitor::new(30.0);
        monitor.observe(snapshot(1, 30, 500_000, 0));

        let report = monitor.observe(snapshot(2, 60, 1_000_000, 0)).unwrap();
        assert!((report.fps - 30.0).abs() < 0.01);
        assert_eq!(report.bitrate_kbps, 4000);
        assert_eq!(report.drop_ratio, 0.0);
        assert_eq!(report.health, StreamHealth::Good);
    }

    #[test]
    fn test_degraded_on_drops() {
        let mut monitor = PerformanceMonitor::new(30.0);
        monitor.observe(snapshot(1, 30, 500_000, 0));

        // 30 sent, 3 dropped in the window: ~9% drop ratio
        let report = monitor.observe(snapshot(2, 60, 1_000_000, 3)).unwrap();
        assert_eq!(report.health, StreamHealth::Degraded);
    }

    #[test]
    fn test_poor_on_fps_collapse() {
        let mut monitor = PerformanceMonitor::new(30.0);
        monitor.observe(snapshot(1, 30, 500_000, 0));

        // 10 fps against a 30 fps target
        let report = monitor.observe(snapshot(2, 40, 700_000, 0)).unwrap();
        assert_eq!(report.health, StreamHealth::Poor);
    }

    #[test]
    fn test_restart_rewind_skipped() {
        let mut monitor = PerformanceMonitor::new(30.0);
        monitor.observe(snapshot(10, 300, 5_000_000, 0));

        // Engine restarted: counters and elapsed went backwards
        assert!(monitor.observe(snapshot(1, 30, 500_000, 0)).is_none());

        // Next window is measured against the post-restart snapshot
        let report = monitor.observe(snapshot(2, 60, 1_000_000, 0)).unwrap();
        assert!((report.fps - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_reset() {
        let mut monitor = PerformanceMonitor::new(30.0);
        monitor.observe(snapshot(1, 30, 500_000, 0));
        monitor.reset();
        assert!(monitor.observe(snapshot(2, 60, 1_000_000, 0)).is_none());
    }
}

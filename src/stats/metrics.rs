//! Streaming statistics

use std::time::Duration;

/// Snapshot of one session's counters
///
/// Produced atomically by the engine: `pending_frames` equals the queue
/// length at the snapshot instant. Counters are monotonic within a session
/// and reset to zero on `start()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamStats {
    /// Frames handed to the link successfully
    pub frames_sent: u64,
    /// Keyframes among `frames_sent`
    pub keyframes_sent: u64,
    /// Payload bytes handed to the link successfully
    pub bytes_sent: u64,
    /// Frames discarded under backpressure, on send failure, or at stop
    pub frames_dropped: u64,
    /// Frames currently queued for transmission
    pub pending_frames: u64,
    /// Current encoder bitrate hint (kbps)
    pub target_bitrate_kbps: u32,
    /// Time since the session started
    pub elapsed: Duration,
}

impl StreamStats {
    /// Total submissions the engine accepted (sent plus dropped)
    pub fn attempted(&self) -> u64 {
        self.frames_sent + self.frames_dropped
    }

    /// Average outgoing bitrate over the whole session (kbps)
    pub fn average_bitrate_kbps(&self) -> u64 {
        bitrate_kbps(self.bytes_sent, self.elapsed)
    }

    /// Average sent-frame rate over the whole session
    pub fn average_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

/// Bitrate in kbps for `bytes` transferred over `elapsed`
///
/// Returns 0 for a zero-length window.
pub fn bitrate_kbps(bytes: u64, elapsed: Duration) -> u64 {
    let millis = elapsed.as_millis() as u64;
    if millis > 0 {
        // bits per millisecond == kilobits per second
        (bytes * 8) / millis
    } else {
        0
    }
}

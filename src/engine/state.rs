//! Session state
//!
//! One streaming session owns a phase, the outbound queue, the send
//! counters, the stored decoder configuration, and the sequence allocator.
//! The whole bundle lives behind a single mutex so the producer thread, the
//! transport worker, and the estimator tick never observe it partially
//! updated (`pending_frames` always matches the queue length).

use std::time::Instant;

use bytes::Bytes;

use crate::stats::StreamStats;

use super::config::EngineConfig;
use super::frame::Frame;
use super::queue::FrameQueue;
use super::resend::ResendSchedule;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No session
    Idle,
    /// `start()` accepted, worker not yet running
    Starting,
    /// Worker running, frames flowing
    Streaming,
    /// `stop()` requested, worker winding down
    Stopping,
    /// Session over; terminal for this session
    Stopped,
    /// Fatal link failure; caller must `stop()` and restart
    Error,
}

impl StreamPhase {
    /// Whether frame submissions are accepted in this phase
    ///
    /// `Starting` accepts: the producer typically pushes SPS/PPS right
    /// after `start()` returns, before the worker's first poll.
    pub fn accepts_frames(&self) -> bool {
        matches!(self, StreamPhase::Starting | StreamPhase::Streaming)
    }
}

/// Monotonic send counters for one session
#[derive(Debug, Clone, Copy, Default)]
pub struct SendCounters {
    /// Frames handed to the link successfully
    pub frames_sent: u64,
    /// Keyframes among `frames_sent`
    pub keyframes_sent: u64,
    /// Payload bytes handed to the link successfully
    pub bytes_sent: u64,
    /// Frames discarded by the drop policy, send failure, or stop drain
    pub frames_dropped: u64,
}

impl SendCounters {
    /// Record a successful send
    pub fn record_sent(&mut self, frame: &Frame) {
        self.frames_sent += 1;
        self.bytes_sent += frame.size() as u64;
        if frame.is_key() {
            self.keyframes_sent += 1;
        }
    }

    /// Record discarded frames
    pub fn record_dropped(&mut self, count: u64) {
        self.frames_dropped += count;
    }
}

/// All mutable state of one streaming session
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: StreamPhase,

    /// Outbound queue
    pub queue: FrameQueue,

    /// Send counters
    pub counters: SendCounters,

    /// Stored SPS/PPS payload for periodic re-send
    pub config_payload: Option<Bytes>,

    /// Timestamp carried by the stored config
    pub config_timestamp: i64,

    /// Config re-send schedule
    pub resend: ResendSchedule,

    /// Set when the worker saw a slow send or the caller reported
    /// congestion; consumed by the next estimator tick
    pub congestion_hint: bool,

    /// Session start time
    pub started_at: Instant,

    next_sequence: u64,
}

impl SessionState {
    /// Create the state for a fresh session
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            phase: StreamPhase::Starting,
            queue: FrameQueue::new(config.queue_capacity),
            counters: SendCounters::default(),
            config_payload: None,
            config_timestamp: 0,
            resend: ResendSchedule::new(),
            congestion_hint: false,
            started_at: Instant::now(),
            next_sequence: 0,
        }
    }

    /// Allocate the next wire sequence number
    pub fn allocate_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// Worker is up: `Starting` becomes `Streaming`
    pub fn begin_streaming(&mut self) -> bool {
        if self.phase == StreamPhase::Starting {
            self.phase = StreamPhase::Streaming;
            true
        } else {
            false
        }
    }

    /// `stop()` requested
    pub fn begin_stopping(&mut self) {
        if matches!(
            self.phase,
            StreamPhase::Starting | StreamPhase::Streaming | StreamPhase::Error
        ) {
            self.phase = StreamPhase::Stopping;
        }
    }

    /// Worker wound down; queue must already be empty
    pub fn mark_stopped(&mut self) {
        self.phase = StreamPhase::Stopped;
    }

    /// Fatal link failure
    pub fn mark_error(&mut self) {
        if matches!(self.phase, StreamPhase::Starting | StreamPhase::Streaming) {
            self.phase = StreamPhase::Error;
        }
    }

    /// Consistent stats snapshot at this instant
    pub fn snapshot(&self, target_bitrate_kbps: u32) -> StreamStats {
        StreamStats {
            frames_sent: self.counters.frames_sent,
            keyframes_sent: self.counters.keyframes_sent,
            bytes_sent: self.counters.bytes_sent,
            frames_dropped: self.counters.frames_dropped,
            pending_frames: self.queue.len() as u64,
            target_bitrate_kbps,
            elapsed: self.started_at.elapsed(),
        }
    }
}

//! Stream engine
//!
//! `StreamEngine` is the frame transport and flow-control core. The
//! encoder callback submits frames from its own thread; a dedicated
//! transport worker drains the bounded queue and hands framed messages to
//! the device link; a periodic estimator derives bandwidth and drives the
//! congestion response. The producer path never blocks and never touches
//! the link.
//!
//! ```text
//!  encoder ──► send_frame / send_sps_pps          (producer, non-blocking)
//!                    │
//!                    ▼
//!              FrameQueue + drop policy           (bounded, evicts deltas)
//!                    │
//!                    ▼
//!              transport worker ──► DeviceLink    (one task, FIFO order)
//!                    │
//!                    ▼
//!              counters ──► estimator tick ──► StreamEvent::BandwidthUpdate
//!                                        └────► StreamEvent::CongestionDetected
//! ```
//!
//! Callbacks are delivered as [`StreamEvent`]s on the receiver returned by
//! [`StreamEngine::new`]. Events are emitted with `try_send` so a stalled
//! consumer can never stall the engine; drain the receiver promptly.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::error::{Error, FrameError, Result};
use crate::link::device::DeviceLink;
use crate::link::message::FrameHeader;
use crate::stats::metrics::bitrate_kbps;
use crate::stats::StreamStats;

use super::config::EngineConfig;
use super::frame::{Frame, FrameKind};
use super::queue::EnqueueOutcome;
use super::state::{SessionState, StreamPhase};

/// Event channel capacity
const EVENT_CAPACITY: usize = 256;

/// Congestion backoff: target drops to 3/4 on each episode
const BACKOFF_NUM: u64 = 3;
const BACKOFF_DEN: u64 = 4;

/// Events from the stream engine
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Worker is up, frames are flowing
    Started,
    /// Session wound down, queue empty
    Stopped,
    /// Fatal failure; the session is in `Error` until `stop()`
    Error(Error),
    /// Periodic outgoing bandwidth measurement
    BandwidthUpdate {
        /// Measured bitrate over the last tick (kbps)
        kbps: u64,
    },
    /// A congestion episode began; the target bitrate was backed off
    CongestionDetected {
        /// New target bitrate the encoder should reconfigure to (kbps)
        target_kbps: u32,
    },
}

/// State shared by the producer, the worker, and the estimator
struct SessionShared {
    state: Mutex<SessionState>,
    notify: Notify,
}

impl SessionShared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        // A poisoned lock only means a prior holder panicked; the session
        // state itself is a plain value and still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bitrate target and congestion episode tracking
struct CongestionControl {
    target_kbps: u32,
    floor_kbps: u32,
    in_episode: bool,
}

impl CongestionControl {
    /// Apply a congestion signal; returns the reduced target when this
    /// signal opens a new episode, `None` while one is already running.
    fn on_signal(&mut self) -> Option<u32> {
        if self.in_episode {
            return None;
        }
        self.in_episode = true;
        let reduced = (self.target_kbps as u64 * BACKOFF_NUM / BACKOFF_DEN) as u32;
        self.target_kbps = reduced.max(self.floor_kbps);
        Some(self.target_kbps)
    }

    fn end_episode(&mut self) {
        self.in_episode = false;
    }
}

struct ActiveTasks {
    worker: JoinHandle<()>,
    estimator: JoinHandle<()>,
}

/// Ownership of the worker and queue lives only in the active variant
enum Session {
    /// No session yet
    Idle,
    /// Session running
    Active {
        shared: Arc<SessionShared>,
        tasks: ActiveTasks,
    },
    /// Session over; stats stay readable until the next `start()`
    Finished { shared: Arc<SessionShared> },
}

/// Frame transport and flow-control engine
///
/// One engine instance drives one stream at a time. A fresh `start()`
/// after `stop()` begins a new session with zeroed statistics and a new
/// sequence-number space.
///
/// # Example
/// ```no_run
/// use bytes::Bytes;
/// use camlink::engine::{EngineConfig, FrameKind, StreamEngine};
/// use camlink::link::MemoryLink;
///
/// # async fn example() -> camlink::error::Result<()> {
/// let (mut engine, mut events) = StreamEngine::new(EngineConfig::default());
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// engine.start(MemoryLink::new())?;
/// engine.send_sps_pps(&[0x67, 0x42], &[0x68, 0xce])?;
/// engine.send_frame(Bytes::from_static(&[0u8; 128]), FrameKind::Key, 0)?;
/// engine.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct StreamEngine {
    config: EngineConfig,
    event_tx: mpsc::Sender<StreamEvent>,
    congestion: Arc<Mutex<CongestionControl>>,
    session: Session,
}

impl StreamEngine {
    /// Create an engine.
    ///
    /// Returns the engine and the receiver for its events.
    pub fn new(config: EngineConfig) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);

        let congestion = Arc::new(Mutex::new(CongestionControl {
            target_kbps: config.initial_bitrate_kbps,
            floor_kbps: config.min_bitrate_kbps,
            in_episode: false,
        }));

        let engine = Self {
            config,
            event_tx: tx,
            congestion,
            session: Session::Idle,
        };

        (engine, rx)
    }

    /// Start a streaming session over `link`.
    ///
    /// Resets statistics, the sequence space, and the config re-send
    /// schedule, then spawns the transport worker and the estimator. Must
    /// be called from within a tokio runtime.
    ///
    /// Fails with [`Error::AlreadyStreaming`] while a session is active.
    pub fn start<L: DeviceLink + 'static>(&mut self, link: L) -> Result<()> {
        if matches!(self.session, Session::Active { .. }) {
            return Err(Error::AlreadyStreaming);
        }

        let shared = Arc::new(SessionShared {
            state: Mutex::new(SessionState::new(&self.config)),
            notify: Notify::new(),
        });

        // A new session is a clean slate for episode tracking
        self.congestion().end_episode();

        let worker = tokio::spawn(run_worker(
            link,
            Arc::clone(&shared),
            self.event_tx.clone(),
            self.config.send_latency_threshold,
        ));
        let estimator = tokio::spawn(run_estimator(
            Arc::clone(&shared),
            Arc::clone(&self.congestion),
            self.event_tx.clone(),
            self.config.stats_interval,
        ));

        tracing::info!(
            queue_capacity = self.config.queue_capacity,
            target_kbps = self.target_bitrate(),
            "stream session starting"
        );

        self.session = Session::Active {
            shared,
            tasks: ActiveTasks { worker, estimator },
        };
        Ok(())
    }

    /// Stop the active session.
    ///
    /// Remaining queued frames are discarded (and counted as dropped); the
    /// worker gets at most the configured drain timeout to wind down.
    /// Fires [`StreamEvent::Stopped`]. A no-op when no session is active.
    pub async fn stop(&mut self) {
        let session = std::mem::replace(&mut self.session, Session::Idle);
        let (shared, tasks) = match session {
            Session::Active { shared, tasks } => (shared, tasks),
            other => {
                self.session = other;
                return;
            }
        };

        shared.state().begin_stopping();
        shared.notify.notify_one();

        let ActiveTasks {
            mut worker,
            estimator,
        } = tasks;
        if tokio::time::timeout(self.config.drain_timeout, &mut worker)
            .await
            .is_err()
        {
            // Worker stuck in a link send past the grace period
            worker.abort();
            tracing::warn!("transport worker aborted at drain timeout");
        }
        estimator.abort();

        {
            let mut state = shared.state();
            let discarded = state.queue.clear();
            state.counters.record_dropped(discarded);
            state.mark_stopped();
        }

        tracing::info!("stream session stopped");
        let _ = self.event_tx.try_send(StreamEvent::Stopped);
        self.session = Session::Finished { shared };
    }

    /// Submit the SPS/PPS decoder configuration.
    ///
    /// Stores the pair for periodic re-send and enqueues it at keyframe
    /// priority. Resets the re-send schedule. Silently ignored unless a
    /// session is starting or streaming; fails on an empty parameter set.
    pub fn send_sps_pps(&self, sps: &[u8], pps: &[u8]) -> Result<()> {
        let Some(shared) = self.active_shared() else {
            return Ok(());
        };
        let mut state = shared.state();
        if !state.phase.accepts_frames() {
            return Ok(());
        }

        if sps.is_empty() || pps.is_empty() {
            return Err(FrameError::EmptyParameterSet.into());
        }

        let mut payload = BytesMut::with_capacity(sps.len() + pps.len());
        payload.put_slice(sps);
        payload.put_slice(pps);

        self.submit(&shared, &mut state, payload.freeze(), FrameKind::Config, 0)
    }

    /// Submit one encoded frame.
    ///
    /// Never blocks: under pressure the drop policy decides silently, and
    /// drops only show up in the statistics. Silently ignored unless a
    /// session is starting or streaming. Fails on an empty payload, or on
    /// a key/delta frame before any configuration was supplied.
    pub fn send_frame(&self, payload: Bytes, kind: FrameKind, timestamp_micros: i64) -> Result<()> {
        let Some(shared) = self.active_shared() else {
            return Ok(());
        };
        let mut state = shared.state();
        if !state.phase.accepts_frames() {
            return Ok(());
        }

        if payload.is_empty() {
            return Err(FrameError::EmptyPayload.into());
        }
        if kind != FrameKind::Config && state.config_payload.is_none() {
            return Err(FrameError::MissingConfig.into());
        }

        self.submit(&shared, &mut state, payload, kind, timestamp_micros)
    }

    /// Consistent statistics snapshot
    ///
    /// All zeros before the first `start()`; after `stop()` the final
    /// session numbers remain readable until the next `start()`.
    pub fn stats(&self) -> StreamStats {
        let target_bitrate_kbps = self.target_bitrate();
        match &self.session {
            Session::Idle => StreamStats {
                target_bitrate_kbps,
                ..Default::default()
            },
            Session::Active { shared, .. } | Session::Finished { shared } => {
                shared.state().snapshot(target_bitrate_kbps)
            }
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> StreamPhase {
        match &self.session {
            Session::Idle => StreamPhase::Idle,
            Session::Active { shared, .. } | Session::Finished { shared } => shared.state().phase,
        }
    }

    /// Set the encoder bitrate hint explicitly.
    ///
    /// The engine never raises the target on its own; ramping back up
    /// after congestion is the caller's decision, made here.
    pub fn set_target_bitrate(&self, kbps: u32) -> Result<()> {
        if kbps == 0 {
            return Err(Error::ZeroBitrate);
        }
        self.congestion().target_kbps = kbps;
        tracing::debug!(kbps, "target bitrate set");
        Ok(())
    }

    /// Current encoder bitrate hint (kbps)
    pub fn target_bitrate(&self) -> u32 {
        self.congestion().target_kbps
    }

    /// Report congestion observed outside the engine.
    ///
    /// Opens a congestion episode (or sustains a running one): the first
    /// signal of an episode backs the target bitrate off by 25 % down to
    /// the configured floor and fires [`StreamEvent::CongestionDetected`];
    /// further signals within the episode are absorbed. Ignored while no
    /// session is live.
    pub fn notify_congestion(&self) {
        let Some(shared) = self.active_shared() else {
            return;
        };
        {
            let mut state = shared.state();
            if !state.phase.accepts_frames() {
                return;
            }
            // Sustains the episode through the next estimator tick
            state.congestion_hint = true;
        }

        if let Some(target_kbps) = self.congestion().on_signal() {
            tracing::warn!(target_kbps, "congestion reported, backing off bitrate");
            let _ = self
                .event_tx
                .try_send(StreamEvent::CongestionDetected { target_kbps });
        }
    }

    /// Enqueue under the lock already held, then wake the worker
    fn submit(
        &self,
        shared: &SessionShared,
        state: &mut SessionState,
        payload: Bytes,
        kind: FrameKind,
        timestamp_micros: i64,
    ) -> Result<()> {
        if kind == FrameKind::Config {
            state.config_payload = Some(payload.clone());
            state.config_timestamp = timestamp_micros;
            state.resend.reset();
        }

        // Sequence numbers are stamped by the worker at transmission time,
        // so the wire sees them strictly increasing even across re-sends
        let frame = Frame::new(payload, kind, timestamp_micros, 0);
        let outcome = state.queue.enqueue(frame);
        state.counters.record_dropped(outcome.dropped_count());

        match outcome {
            EnqueueOutcome::Accepted => {}
            EnqueueOutcome::AcceptedAfterEvict => {
                tracing::debug!(kind = %kind, "evicted oldest delta under pressure");
            }
            EnqueueOutcome::Dropped => {
                tracing::debug!(kind = %kind, "queue saturated, frame dropped");
                return Ok(());
            }
        }

        shared.notify.notify_one();
        Ok(())
    }

    fn active_shared(&self) -> Option<Arc<SessionShared>> {
        match &self.session {
            Session::Active { shared, .. } => Some(Arc::clone(shared)),
            _ => None,
        }
    }

    fn congestion(&self) -> MutexGuard<'_, CongestionControl> {
        self.congestion.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        if let Session::Active { tasks, .. } = &self.session {
            tasks.worker.abort();
            tasks.estimator.abort();
        }
    }
}

/// One worker-loop decision, made under the state lock
enum Step {
    /// Send this frame over the link
    Send(Frame),
    /// Queue empty; park until notified
    Park,
    /// Session winding down; discard what remains and exit
    Drain,
}

/// Transport worker: drains the queue FIFO and owns the link.
///
/// Sends block this task only. Any link failure is fatal for the session:
/// the frame counts as dropped, no retry, and the engine waits for an
/// explicit `stop()`.
async fn run_worker<L: DeviceLink>(
    mut link: L,
    shared: Arc<SessionShared>,
    event_tx: mpsc::Sender<StreamEvent>,
    latency_threshold: Duration,
) {
    if shared.state().begin_streaming() {
        tracing::info!("stream session started");
        let _ = event_tx.try_send(StreamEvent::Started);
    }

    loop {
        let step = {
            let mut state = shared.state();
            match state.phase {
                StreamPhase::Streaming => {
                    if state.resend.is_due() && state.config_payload.is_some() {
                        // Periodic config re-send goes out ahead of the
                        // next queued frame, with a fresh sequence number
                        let payload = state.config_payload.clone().unwrap_or_default();
                        let timestamp = state.config_timestamp;
                        let sequence = state.allocate_sequence();
                        state.resend.reset();
                        tracing::debug!(sequence, "re-sending decoder config");
                        Step::Send(Frame::new(payload, FrameKind::Config, timestamp, sequence))
                    } else {
                        match state.queue.pop() {
                            Some(mut frame) => {
                                frame.sequence = state.allocate_sequence();
                                Step::Send(frame)
                            }
                            None => Step::Park,
                        }
                    }
                }
                _ => Step::Drain,
            }
        };

        match step {
            Step::Send(frame) => {
                let header = FrameHeader::for_frame(&frame);
                tracing::trace!(
                    sequence = frame.sequence,
                    kind = %frame.kind,
                    size = frame.size(),
                    "sending frame"
                );

                let send_started = Instant::now();
                let result = link.send_message(header, frame.payload.clone()).await;
                let latency = send_started.elapsed();

                match result {
                    Ok(()) => {
                        let mut state = shared.state();
                        state.counters.record_sent(&frame);
                        state.resend.on_transmitted();
                        if frame.is_config() {
                            state.resend.reset();
                        }
                        if latency > latency_threshold {
                            state.congestion_hint = true;
                            tracing::debug!(latency_ms = latency.as_millis() as u64, "slow link send");
                        }
                    }
                    Err(e) => {
                        {
                            let mut state = shared.state();
                            state.counters.record_dropped(1);
                            state.mark_error();
                        }
                        tracing::error!(
                            sequence = frame.sequence,
                            error = %e,
                            "link send failed, session in error state"
                        );
                        let _ = event_tx.try_send(StreamEvent::Error(Error::Link(e)));
                        return;
                    }
                }
            }
            Step::Park => shared.notify.notified().await,
            Step::Drain => {
                let mut state = shared.state();
                let discarded = state.queue.clear();
                state.counters.record_dropped(discarded);
                if discarded > 0 {
                    tracing::debug!(discarded, "discarded queued frames at stop");
                }
                return;
            }
        }
    }
}

/// Estimator: periodic bandwidth measurement and congestion edge detection
async fn run_estimator(
    shared: Arc<SessionShared>,
    congestion: Arc<Mutex<CongestionControl>>,
    event_tx: mpsc::Sender<StreamEvent>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; it sets the baseline
    ticker.tick().await;

    let mut last_bytes = 0u64;
    let mut last_instant = Instant::now();

    loop {
        ticker.tick().await;

        let (phase, bytes_sent, hint) = {
            let mut state = shared.state();
            let hint = std::mem::take(&mut state.congestion_hint);
            (state.phase, state.counters.bytes_sent, hint)
        };

        match phase {
            StreamPhase::Starting => continue,
            StreamPhase::Streaming => {}
            _ => return,
        }

        let now = Instant::now();
        let kbps = bitrate_kbps(bytes_sent - last_bytes, now - last_instant);
        last_bytes = bytes_sent;
        last_instant = now;

        tracing::trace!(kbps, "bandwidth tick");
        let _ = event_tx.try_send(StreamEvent::BandwidthUpdate { kbps });

        if hint {
            let new_target = {
                let mut control = congestion.lock().unwrap_or_else(|e| e.into_inner());
                control.on_signal()
            };
            if let Some(target_kbps) = new_target {
                tracing::warn!(target_kbps, "congestion detected, backing off bitrate");
                let _ = event_tx.try_send(StreamEvent::CongestionDetected { target_kbps });
            }
        } else {
            let mut control = congestion.lock().unwrap_or_else(|e| e.into_inner());
            control.end_episode();
        }
    }
}

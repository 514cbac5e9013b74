//! Frame transport and flow-control engine
//!
//! The engine accepts encoded frames from a hardware encoder at an
//! unpredictable rate and moves them over a device link under real-time
//! constraints: never block the producer, never starve the decoder of a
//! valid reference frame, bound memory growth, and recover transparently
//! from stalls.
//!
//! # Architecture
//!
//! ```text
//!                         StreamEngine
//!                 ┌──────────────────────────┐
//!   send_frame ──►│ Mutex<SessionState> {    │
//!   send_sps_pps  │   queue, counters,       │
//!                 │   config, resend, seq    │◄── estimator tick
//!                 │ }                        │      (bandwidth,
//!                 └────────────┬─────────────┘       congestion)
//!                              │
//!                              ▼
//!                      transport worker
//!                              │
//!                              ▼
//!                    DeviceLink::send_message
//! ```
//!
//! The producer, the worker, and the estimator share exactly one mutex
//! over the session state; no I/O ever happens under the lock, so producer
//! calls stay bounded no matter what the link does.

pub mod config;
pub mod frame;
pub mod queue;
pub mod resend;
pub mod state;
pub mod stream;

pub use config::{EngineConfig, DEFAULT_QUEUE_CAPACITY};
pub use frame::{Frame, FrameKind};
pub use queue::{EnqueueOutcome, FrameQueue};
pub use resend::{ResendSchedule, RESEND_INTERVAL};
pub use state::StreamPhase;
pub use stream::{StreamEngine, StreamEvent};

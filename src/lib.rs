//! # camlink
//!
//! Frame transport and flow-control engine for streaming a live
//! H.264-encoded camera feed to a remote peer over a persistent device
//! link, where the peer consumes the feed as a virtual camera.
//!
//! The crate sits between a hardware encoder and a reliable,
//! congestion-opaque link, and solves the conflicting real-time goals in
//! between:
//!
//! - **Never block the producer**: frame submission is a bounded, lock-only
//!   operation; under pressure the drop policy evicts delta frames.
//! - **Never starve the decoder**: SPS/PPS and keyframes survive
//!   backpressure, and the decoder configuration is re-sent periodically so
//!   a recovering receiver can resynchronize without renegotiation.
//! - **Bound memory**: one fixed-capacity queue per session.
//! - **Adapt to congestion**: a periodic bandwidth estimator plus explicit
//!   congestion signals back the target bitrate off, once per episode.
//!
//! # Quick start
//!
//! ```no_run
//! use bytes::Bytes;
//! use camlink::engine::{EngineConfig, FrameKind, StreamEngine};
//! use camlink::link::MemoryLink;
//!
//! # async fn example() -> camlink::error::Result<()> {
//! let (mut engine, mut events) = StreamEngine::new(EngineConfig::default());
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! engine.start(MemoryLink::new())?;
//! engine.send_sps_pps(&[0x67, 0x42, 0x00, 0x1f], &[0x68, 0xce, 0x38, 0x80])?;
//! engine.send_frame(Bytes::from_static(&[0u8; 2048]), FrameKind::Key, 0)?;
//! engine.stop().await;
//! println!("{:?}", engine.stats());
//! # Ok(())
//! # }
//! ```
//!
//! Decoding, rendering, and the link transport itself are out of scope;
//! implement [`link::DeviceLink`] over your transport of choice.

pub mod engine;
pub mod error;
pub mod link;
pub mod stats;

pub use engine::{EngineConfig, Frame, FrameKind, StreamEngine, StreamEvent, StreamPhase};
pub use error::{Error, FrameError, LinkError, Result};
pub use link::{DeviceLink, FrameHeader, MemoryLink};
pub use stats::{PerformanceMonitor, PerformanceReport, StreamHealth, StreamStats};

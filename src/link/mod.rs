//! Device link transport
//!
//! This module provides:
//! - Wire message framing (fixed, session-independent layout)
//! - The `DeviceLink` trait the engine sends through
//! - An in-process link for tests and demos

pub mod device;
pub mod memory;
pub mod message;

pub use device::DeviceLink;
pub use memory::{MemoryLink, SentLog, SentMessage};
pub use message::{decode_message, encode_message, DecodeError, FrameHeader};

//! Device link seam
//!
//! The engine is transport-agnostic: anything that can move one framed
//! message to the peer implements [`DeviceLink`]. The link is assumed to
//! deliver accepted messages reliably and in order per connection; it is
//! opaque to congestion, which the engine infers from send latency and
//! explicit caller signals instead.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LinkError;

use super::message::FrameHeader;

/// Transport handle for framed messages
///
/// `send_message` blocks the transport worker, never the producer. It may
/// fail synchronously (not connected) or on write; the engine treats any
/// failure as fatal for the session and performs no retries — reconnection
/// is the link's owner's responsibility.
#[async_trait]
pub trait DeviceLink: Send {
    /// Hand one logical message to the link
    async fn send_message(&mut self, header: FrameHeader, payload: Bytes)
        -> Result<(), LinkError>;
}

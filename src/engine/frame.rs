//! Encoded frame types
//!
//! This module defines the value describing one encoded H.264 access unit
//! as it moves from the encoder callback through the queue to the wire.

use bytes::Bytes;

/// Kind of an encoded frame
///
/// Discriminant values are part of the wire format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// SPS/PPS decoder configuration
    Config = 0x00,
    /// Independently decodable frame (IDR)
    Key = 0x01,
    /// Frame decodable only against prior frames
    Delta = 0x02,
}

impl FrameKind {
    /// Parse a kind from its wire discriminant
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(FrameKind::Config),
            0x01 => Some(FrameKind::Key),
            0x02 => Some(FrameKind::Delta),
            _ => None,
        }
    }

    /// Whether the drop policy may evict this frame to make room
    pub fn is_evictable(&self) -> bool {
        matches!(self, FrameKind::Delta)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Config => write!(f, "config"),
            FrameKind::Key => write!(f, "key"),
            FrameKind::Delta => write!(f, "delta"),
        }
    }
}

/// One encoded access unit
///
/// Cheap to clone: the payload is reference-counted via `Bytes`, so clones
/// share the allocation. Sequence numbers are assigned by the engine in
/// transmission order, never by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Encoded payload
    pub payload: Bytes,
    /// Frame kind
    pub kind: FrameKind,
    /// Capture timestamp in microseconds
    pub timestamp_micros: i64,
    /// Engine-assigned sequence number, monotonic within a session
    pub sequence: u64,
}

impl Frame {
    /// Create a frame
    pub fn new(payload: Bytes, kind: FrameKind, timestamp_micros: i64, sequence: u64) -> Self {
        Self {
            payload,
            kind,
            timestamp_micros,
            sequence,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Whether this frame carries decoder configuration
    pub fn is_config(&self) -> bool {
        self.kind == FrameKind::Config
    }

    /// Whether this frame is a keyframe
    pub fn is_key(&self) -> bool {
        self.kind == FrameKind::Key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [FrameKind::Config, FrameKind::Key, FrameKind::Delta] {
            assert_eq!(FrameKind::from_byte(kind as u8), Some(kind));
        }
        assert_eq!(FrameKind::from_byte(0x03), None);
    }

    #[test]
    fn test_evictable() {
        assert!(FrameKind::Delta.is_evictable());
        assert!(!FrameKind::Key.is_evictable());
        assert!(!FrameKind::Config.is_evictable());
    }

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::new(Bytes::from_static(&[1, 2, 3]), FrameKind::Key, 33_333, 7);

        assert_eq!(frame.size(), 3);
        assert!(frame.is_key());
        assert!(!frame.is_config());
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_clone_shares_payload() {
        let frame = Frame::new(Bytes::from(vec![0u8; 1024]), FrameKind::Delta, 0, 0);
        let copy = frame.clone();

        // Bytes clones are reference-counted, not copied
        assert_eq!(copy.payload.as_ptr(), frame.payload.as_ptr());
    }
}

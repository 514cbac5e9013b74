//! Wire message framing
//!
//! Each frame travels over the device link as one logical message:
//!
//! ```text
//! +----------+------------------+----------------+--------------+---------+
//! | Kind     | TimestampMicros  | Sequence       | PayloadLen   | Payload |
//! | (1 byte) | (i64, 8 bytes BE)| (u64, 8 bytes) | (u32, 4 B)   | (var)   |
//! +----------+------------------+----------------+--------------+---------+
//! ```
//!
//! Kind discriminator: 0x00 config, 0x01 key, 0x02 delta.
//!
//! The layout is fixed and session-independent: a cold-started receiver
//! only needs the next config + keyframe pair to begin decoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::engine::frame::{Frame, FrameKind};

/// Error type for message decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes for the header or the advertised payload
    InsufficientData,
    /// Unknown frame kind discriminator
    InvalidKind(u8),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InsufficientData => write!(f, "Insufficient data"),
            DecodeError::InvalidKind(b) => write!(f, "Invalid frame kind: {:#04x}", b),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Header of one wire message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame kind
    pub kind: FrameKind,
    /// Capture timestamp in microseconds
    pub timestamp_micros: i64,
    /// Engine-assigned sequence number
    pub sequence: u64,
    /// Payload length in bytes
    pub payload_len: u32,
}

impl FrameHeader {
    /// Encoded header size in bytes
    pub const SIZE: usize = 1 + 8 + 8 + 4;

    /// Build the header for a frame
    pub fn for_frame(frame: &Frame) -> Self {
        Self {
            kind: frame.kind,
            timestamp_micros: frame.timestamp_micros,
            sequence: frame.sequence,
            payload_len: frame.payload.len() as u32,
        }
    }
}

/// Encode a header + payload into one contiguous wire message
pub fn encode_message(header: &FrameHeader, payload: &Bytes) -> Bytes {
    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload.len());

    // Kind (1 byte)
    buf.put_u8(header.kind as u8);

    // Timestamp (8 bytes)
    buf.put_i64(header.timestamp_micros);

    // Sequence (8 bytes)
    buf.put_u64(header.sequence);

    // Payload length (4 bytes)
    buf.put_u32(header.payload_len);

    // Payload
    buf.extend_from_slice(payload);

    buf.freeze()
}

/// Decode one wire message back into a frame
///
/// Consumes exactly one message from `data`. The payload is copied out of
/// the buffer, so the caller may reuse it.
pub fn decode_message(data: &mut impl Buf) -> Result<Frame, DecodeError> {
    if data.remaining() < FrameHeader::SIZE {
        return Err(DecodeError::InsufficientData);
    }

    let kind_byte = data.get_u8();
    let kind = FrameKind::from_byte(kind_byte).ok_or(DecodeError::InvalidKind(kind_byte))?;

    let timestamp_micros = data.get_i64();
    let sequence = data.get_u64();
    let payload_len = data.get_u32() as usize;

    if data.remaining() < payload_len {
        return Err(DecodeError::InsufficientData);
    }

    let payload = data.copy_to_bytes(payload_len);

    Ok(Frame::new(payload, kind, timestamp_micros, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(kind: FrameKind) -> Frame {
        Frame::new(Bytes::from_static(&[0xAA; 48]), kind, 1_234_567, 42)
    }

    #[test]
    fn test_header_size() {
        assert_eq!(FrameHeader::SIZE, 21);
    }

    #[test]
    fn test_encode_layout() {
        let frame = make_frame(FrameKind::Key);
        let header = FrameHeader::for_frame(&frame);
        let message = encode_message(&header, &frame.payload);

        assert_eq!(message.len(), FrameHeader::SIZE + 48);
        assert_eq!(message[0], 0x01); // key discriminator
        assert_eq!(&message[1..9], &1_234_567i64.to_be_bytes());
        assert_eq!(&message[9..17], &42u64.to_be_bytes());
        assert_eq!(&message[17..21], &48u32.to_be_bytes());
        assert_eq!(&message[21..], &[0xAA; 48]);
    }

    #[test]
    fn test_roundtrip() {
        for kind in [FrameKind::Config, FrameKind::Key, FrameKind::Delta] {
            let frame = make_frame(kind);
            let header = FrameHeader::for_frame(&frame);
            let mut message = encode_message(&header, &frame.payload);

            let decoded = decode_message(&mut message).unwrap();
            assert_eq!(decoded.kind, kind);
            assert_eq!(decoded.timestamp_micros, frame.timestamp_micros);
            assert_eq!(decoded.sequence, frame.sequence);
            assert_eq!(decoded.payload, frame.payload);
        }
    }

    #[test]
    fn test_decode_truncated_header() {
        let mut data = Bytes::from_static(&[0x01, 0x00, 0x00]);
        assert_eq!(
            decode_message(&mut data),
            Err(DecodeError::InsufficientData)
        );
    }

    #[test]
    fn test_decode_truncated_payload() {
        let frame = make_frame(FrameKind::Delta);
        let header = FrameHeader::for_frame(&frame);
        let message = encode_message(&header, &frame.payload);

        let mut truncated = message.slice(..message.len() - 1);
        assert_eq!(
            decode_message(&mut truncated),
            Err(DecodeError::InsufficientData)
        );
    }

    #[test]
    fn test_decode_invalid_kind() {
        let frame = make_frame(FrameKind::Delta);
        let header = FrameHeader::for_frame(&frame);
        let message = encode_message(&header, &frame.payload);

        let mut corrupted = BytesMut::from(&message[..]);
        corrupted[0] = 0x7F;
        let mut data = corrupted.freeze();
        assert_eq!(decode_message(&mut data), Err(DecodeError::InvalidKind(0x7F)));
    }

    #[test]
    fn test_back_to_back_messages() {
        let a = make_frame(FrameKind::Config);
        let b = make_frame(FrameKind::Key);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_message(&FrameHeader::for_frame(&a), &a.payload));
        buf.extend_from_slice(&encode_message(&FrameHeader::for_frame(&b), &b.payload));
        let mut data = buf.freeze();

        assert_eq!(decode_message(&mut data).unwrap().kind, FrameKind::Config);
        assert_eq!(decode_message(&mut data).unwrap().kind, FrameKind::Key);
        assert_eq!(data.remaining(), 0);
    }
}

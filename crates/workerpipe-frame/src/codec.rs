use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::message::MessageType;

/// Frame header: type (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload size: the full range of the length field.
///
/// Suits the streaming receiver, which never buffers a whole payload.
pub const DEFAULT_MAX_PAYLOAD: usize = u32::MAX as usize;

/// Default limit for decoders that buffer whole frames in memory.
pub const DEFAULT_BUFFERED_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Upper bound on buffer growth per incomplete frame; the declared length is
/// untrusted until the bytes actually arrive.
const RESERVE_CHUNK: usize = 64 * 1024;

/// The fixed-size prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub msg_type: MessageType,
    /// Number of payload bytes that follow the header.
    pub length: u32,
}

impl FrameHeader {
    /// Serialize into wire order.
    ///
    /// ```text
    /// ┌──────────────┬──────────────┬──────────────────┐
    /// │ Type (4B LE) │ Length       │ Payload          │
    /// │              │ (4B LE)      │ (Length bytes)   │
    /// └──────────────┴──────────────┴──────────────────┘
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut dst = &mut buf[..];
        dst.put_u32_le(self.msg_type.value());
        dst.put_u32_le(self.length);
        buf
    }

    /// Parse a header from its wire bytes.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut src = &bytes[..];
        let msg_type = MessageType::new(src.get_u32_le());
        let length = src.get_u32_le();
        Self { msg_type, length }
    }
}

/// A whole message held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: MessageType,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(msg_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }

    /// A frame with no payload.
    pub fn empty(msg_type: MessageType) -> Self {
        Self::new(msg_type, Bytes::new())
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Check a payload length against the length field and a configured limit.
pub(crate) fn check_payload_len(len: usize, max: usize) -> Result<u32> {
    let limit = max.min(DEFAULT_MAX_PAYLOAD);
    if len > limit {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: limit,
        });
    }
    Ok(len as u32)
}

/// Encode a frame into the wire format.
pub fn encode_frame(msg_type: MessageType, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = check_payload_len(payload.len(), DEFAULT_MAX_PAYLOAD)?;
    let header = FrameHeader { msg_type, length };
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header.encode());
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&src[..HEADER_SIZE]);
    let header = FrameHeader::decode(&header_bytes);

    let payload_len = header.length as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve((total - src.len()).min(RESERVE_CHUNK));
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        msg_type: header.msg_type,
        payload,
    }))
}

/// Configuration shared by the receive and send halves.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default and ceiling: `u32::MAX`.
    pub max_payload_size: usize,
    /// Read deadline applied to streams that support one.
    pub read_timeout: Option<std::time::Duration>,
    /// Write deadline applied to streams that support one.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

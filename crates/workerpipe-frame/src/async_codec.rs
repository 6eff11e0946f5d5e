//! `tokio_util::codec` adapter for the same wire format.
//!
//! Unlike the blocking receiver, the codec buffers whole frames, so it is
//! meant for supervisors that already run on tokio and handle modest
//! payloads.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{
    check_payload_len, decode_frame, encode_frame, Frame, DEFAULT_BUFFERED_MAX_PAYLOAD,
    HEADER_SIZE,
};
use crate::error::{FrameError, Result};
use crate::message::MessageType;

/// Frame codec for `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_payload_size: usize,
}

impl MessageCodec {
    /// Codec limited to [`DEFAULT_BUFFERED_MAX_PAYLOAD`] per frame.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_BUFFERED_MAX_PAYLOAD)
    }

    /// Limit the payload size accepted by both directions.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match src.len() {
            0 => Ok(None),
            n if n < HEADER_SIZE => Err(FrameError::TruncatedHeader { received: n }),
            n => Err(FrameError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended mid-payload ({} payload bytes buffered)", n - HEADER_SIZE),
            ))),
        }
    }
}

impl Encoder<Frame> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        self.encode((item.msg_type, item.payload), dst)
    }
}

impl Encoder<(MessageType, Bytes)> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, (msg_type, payload): (MessageType, Bytes), dst: &mut BytesMut) -> Result<()> {
        check_payload_len(payload.len(), self.max_payload_size)?;
        encode_frame(msg_type, &payload, dst)
    }
}

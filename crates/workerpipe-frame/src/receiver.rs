use std::io::{self, ErrorKind, Read};

use tracing::debug;
use workerpipe_transport::Close;
#[cfg(unix)]
use workerpipe_transport::IpcStream;

use crate::codec::{Frame, FrameConfig, FrameHeader, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::message::MessageType;
use crate::payload::PayloadReader;
use crate::state::RecvState;

/// The receive half of a framed channel.
///
/// [`receive_message`](Self::receive_message) parses one header and hands back
/// a [`PayloadReader`] bounded to that frame. The payload must be fully read
/// (or discarded) before the next call; otherwise the call fails with
/// [`FrameError::PayloadNotDrained`] and touches nothing.
///
/// One caller at a time: there is no internal locking.
pub struct FrameReceiver<R> {
    inner: R,
    state: RecvState,
    config: FrameConfig,
}

impl<R: Read> FrameReceiver<R> {
    /// Create a new receiver with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new receiver with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            state: RecvState::Idle,
            config,
        }
    }

    /// Block until a frame header arrives and return its type and payload.
    ///
    /// Does not read the payload. End of stream before any header byte is
    /// [`FrameError::ConnectionClosed`]; inside the header it is
    /// [`FrameError::TruncatedHeader`]. A failed header read leaves the
    /// receiver `Idle`.
    pub fn receive_message(&mut self) -> Result<(MessageType, PayloadReader<'_, R>)> {
        if let RecvState::PayloadPending { remaining } = self.state {
            return Err(FrameError::PayloadNotDrained { remaining });
        }

        let header = read_header(&mut self.inner)?;
        debug!(
            msg_type = %header.msg_type,
            msg_type_raw = header.msg_type.value(),
            size = header.length,
            "received frame header"
        );

        self.state = RecvState::pending(header.length);
        let payload = PayloadReader::new(&mut self.inner, &mut self.state, header.length);
        Ok((header.msg_type, payload))
    }

    /// Receive a whole message into memory.
    ///
    /// Declared lengths above `max_payload_size` fail with
    /// [`FrameError::PayloadTooLarge`] before any payload byte is read; the
    /// payload stays pending and can be skipped with
    /// [`discard_pending`](Self::discard_pending).
    pub fn recv_frame(&mut self) -> Result<Frame> {
        let max = self.config.max_payload_size;
        let (msg_type, payload) = self.receive_message()?;

        let size = payload.declared_len() as usize;
        if size > max {
            return Err(FrameError::PayloadTooLarge { size, max });
        }

        let bytes = payload.read_to_vec()?;
        Ok(Frame::new(msg_type, bytes))
    }

    /// Skip whatever is left of the current payload.
    ///
    /// Use this after dropping a [`PayloadReader`] early. Returns the number of
    /// bytes skipped (0 when already at a frame boundary).
    pub fn discard_pending(&mut self) -> Result<u64> {
        let remaining = self.state.remaining();
        if remaining == 0 {
            return Ok(0);
        }

        let mut payload = PayloadReader::new(&mut self.inner, &mut self.state, remaining);
        let discarded = io::copy(&mut payload, &mut io::sink())?;
        debug!(discarded, "discarded pending payload");
        Ok(discarded)
    }

    /// Current position in the receive state machine.
    pub fn state(&self) -> RecvState {
        self.state
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Reading from it directly desynchronizes the framing.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the receiver and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Update maximum payload size accepted by [`recv_frame`](Self::recv_frame).
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<R: Close> FrameReceiver<R> {
    /// Close the underlying stream.
    pub fn close(self) -> io::Result<()> {
        if let RecvState::PayloadPending { remaining } = self.state {
            debug!(remaining, "closing receive stream with payload pending");
        }
        self.inner.close()
    }
}

#[cfg(unix)]
impl FrameReceiver<IpcStream> {
    /// Create a receiver for `IpcStream` and apply read timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<R> std::fmt::Debug for FrameReceiver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReceiver")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn read_header<R: Read>(inner: &mut R) -> Result<FrameHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0usize;

    while filled < HEADER_SIZE {
        match inner.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Err(FrameError::ConnectionClosed),
            Ok(0) => return Err(FrameError::TruncatedHeader { received: filled }),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    Ok(FrameHeader::decode(&buf))
}

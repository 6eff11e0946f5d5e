use std::io::{self, Read, Write};

use tracing::{debug, warn};
use workerpipe_transport::Close;
#[cfg(unix)]
use workerpipe_transport::{IpcStream, PipeReader, PipeWriter};

use crate::codec::{Frame, FrameConfig};
use crate::error::{CloseError, FrameError, Result};
use crate::message::MessageType;
use crate::payload::PayloadReader;
use crate::receiver::FrameReceiver;
use crate::sender::FrameSender;
use crate::state::RecvState;

/// A duplex framed channel over one readable and one writable stream.
///
/// The two directions share no state. [`split`](Self::split) hands them out
/// as separate owned halves so one thread can receive while another sends;
/// each half still serves one caller at a time.
///
/// [`close`](Self::close) consumes the channel, so nothing can be sent or
/// received afterwards.
pub struct Channel<R, W> {
    receiver: FrameReceiver<R>,
    sender: FrameSender<W>,
}

impl<R: Read, W: Write> Channel<R, W> {
    /// Create a channel with default configuration.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    /// Create a channel with explicit configuration for both directions.
    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            receiver: FrameReceiver::with_config(reader, config.clone()),
            sender: FrameSender::with_config(writer, config),
        }
    }

    /// See [`FrameReceiver::receive_message`].
    pub fn receive_message(&mut self) -> Result<(MessageType, PayloadReader<'_, R>)> {
        self.receiver.receive_message()
    }

    /// See [`FrameReceiver::recv_frame`].
    pub fn recv_frame(&mut self) -> Result<Frame> {
        self.receiver.recv_frame()
    }

    /// See [`FrameReceiver::discard_pending`].
    pub fn discard_pending(&mut self) -> Result<u64> {
        self.receiver.discard_pending()
    }

    /// See [`FrameSender::send_message`].
    pub fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()> {
        self.sender.send_message(msg_type, payload)
    }

    /// See [`FrameSender::send_frame`].
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.sender.send_frame(frame)
    }

    /// Receive-direction state.
    pub fn state(&self) -> RecvState {
        self.receiver.state()
    }
}

impl<R, W> Channel<R, W> {
    /// Join independently created halves.
    pub fn from_halves(receiver: FrameReceiver<R>, sender: FrameSender<W>) -> Self {
        Self { receiver, sender }
    }

    /// Separate the channel into its receive and send halves.
    pub fn split(self) -> (FrameReceiver<R>, FrameSender<W>) {
        (self.receiver, self.sender)
    }

    pub fn receiver(&self) -> &FrameReceiver<R> {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut FrameReceiver<R> {
        &mut self.receiver
    }

    pub fn sender(&self) -> &FrameSender<W> {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut FrameSender<W> {
        &mut self.sender
    }
}

impl<R: Close, W: Close> Channel<R, W> {
    /// Close both streams.
    ///
    /// The send stream is closed even if closing the receive stream fails.
    /// Any failures are returned together as [`FrameError::Close`].
    pub fn close(self) -> Result<()> {
        let Channel { receiver, sender } = self;
        let errors = CloseError {
            receive: receiver.close().err(),
            send: sender.close().err(),
        };

        if let Some(err) = &errors.receive {
            warn!(error = %err, "failed to close receive stream");
        }
        if let Some(err) = &errors.send {
            warn!(error = %err, "failed to close send stream");
        }

        if errors.is_empty() {
            debug!("channel closed");
            Ok(())
        } else {
            Err(FrameError::Close(errors))
        }
    }
}

#[cfg(unix)]
impl Channel<IpcStream, IpcStream> {
    /// Build a channel over a single duplex stream.
    ///
    /// The stream is cloned so each direction owns a handle; timeouts from
    /// `config` are applied to the socket.
    pub fn duplex(stream: IpcStream, config: FrameConfig) -> Result<Self> {
        let reader = stream.try_clone()?;
        Ok(Self::from_halves(
            FrameReceiver::with_config_ipc(reader, config.clone())?,
            FrameSender::with_config_ipc(stream, config)?,
        ))
    }
}

#[cfg(unix)]
impl Channel<PipeReader, PipeWriter> {
    /// Supervisor side of a spawned worker: receive from its stdout, send to
    /// its stdin.
    ///
    /// Both must have been configured with `Stdio::piped()`; they are taken
    /// out of `child`.
    pub fn for_child(child: &mut std::process::Child) -> Result<Self> {
        let stdout = child.stdout.take().ok_or_else(|| {
            FrameError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker stdout is not piped",
            ))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            FrameError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker stdin is not piped",
            ))
        })?;

        debug!(pid = child.id(), "attached channel to worker stdio");
        Ok(Self::new(PipeReader::from(stdout), PipeWriter::from(stdin)))
    }
}

impl<R, W> std::fmt::Debug for Channel<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("receiver", &self.receiver)
            .field("sender", &self.sender)
            .finish()
    }
}

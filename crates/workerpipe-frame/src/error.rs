use std::fmt;
use std::io;

use workerpipe_transport::TransportError;

/// Errors that can occur while sending or receiving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// `receive_message` was called before the previous payload was drained.
    ///
    /// No bytes were consumed; drain or discard the pending payload and retry.
    #[error("previous payload not fully drained ({remaining} bytes remaining)")]
    PayloadNotDrained { remaining: u32 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended at a frame boundary, or a write made no progress.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended partway through a frame header.
    #[error("connection closed mid-header ({received} of 8 header bytes received)")]
    TruncatedHeader { received: usize },

    /// Closing one or both underlying streams failed.
    #[error("failed to close channel: {0}")]
    Close(#[from] CloseError),
}

impl FrameError {
    /// Returns true when the error means the peer's stream has ended.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            FrameError::ConnectionClosed | FrameError::TruncatedHeader { .. } => true,
            FrameError::Io(err) => err.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) | TransportError::Pipe(io) | TransportError::SocketPair(io) => {
                FrameError::Io(io)
            }
        }
    }
}

/// Failures collected while closing both directions of a channel.
///
/// Both closes are always attempted; each field holds that direction's error,
/// if any.
#[derive(Debug, Default)]
pub struct CloseError {
    pub receive: Option<io::Error>,
    pub send: Option<io::Error>,
}

impl CloseError {
    /// Returns true when neither direction failed.
    pub fn is_empty(&self) -> bool {
        self.receive.is_none() && self.send.is_none()
    }
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.receive, &self.send) {
            (Some(recv), Some(send)) => {
                write!(f, "receive stream: {recv}; send stream: {send}")
            }
            (Some(recv), None) => write!(f, "receive stream: {recv}"),
            (None, Some(send)) => write!(f, "send stream: {send}"),
            (None, None) => f.write_str("no close errors"),
        }
    }
}

impl std::error::Error for CloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.receive
            .as_ref()
            .or(self.send.as_ref())
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

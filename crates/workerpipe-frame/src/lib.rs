//! Typed, length-prefixed message framing between a supervisor and a worker.
//!
//! Every message on the wire is:
//! - A 4-byte little-endian message type
//! - A 4-byte little-endian payload length
//! - Exactly that many payload bytes
//!
//! The receive side hands out a reader bounded to one payload and refuses to
//! parse the next header until that payload has been drained. The send side
//! writes one complete frame per call and keeps no state in between.

pub mod channel;
pub mod codec;
pub mod error;
pub mod message;
pub mod payload;
pub mod receiver;
pub mod sender;
pub mod state;
pub mod traits;

#[cfg(feature = "async")]
pub mod async_codec;

pub use channel::Channel;
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, FrameHeader, DEFAULT_BUFFERED_MAX_PAYLOAD,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{CloseError, FrameError, Result};
pub use message::{MessageType, ParseMessageTypeError};
pub use payload::PayloadReader;
pub use receiver::FrameReceiver;
pub use sender::FrameSender;
pub use state::RecvState;
pub use traits::{MessageReceiver, MessageSender};

#[cfg(feature = "async")]
pub use async_codec::MessageCodec;

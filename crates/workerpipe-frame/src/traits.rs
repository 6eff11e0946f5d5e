//! Collaborator-facing contracts.
//!
//! Supervision, configuration delivery and log relaying are written against
//! these traits rather than a concrete channel, so they can be driven by a
//! [`FrameReceiver`]/[`FrameSender`] pair, a whole [`Channel`], or a test
//! double.

use std::io::{Read, Write};

use crate::channel::Channel;
use crate::error::Result;
use crate::message::MessageType;
use crate::payload::PayloadReader;
use crate::receiver::FrameReceiver;
use crate::sender::FrameSender;

/// Source of typed messages.
pub trait MessageReceiver {
    /// Reader over one message's payload.
    type Payload<'a>: Read
    where
        Self: 'a;

    /// Block until the next message header arrives.
    ///
    /// The previous payload must have been drained first.
    fn receive_message(&mut self) -> Result<(MessageType, Self::Payload<'_>)>;
}

/// Sink for typed messages.
pub trait MessageSender {
    /// Send one complete message.
    fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()>;
}

impl<R: Read> MessageReceiver for FrameReceiver<R> {
    type Payload<'a>
        = PayloadReader<'a, R>
    where
        Self: 'a;

    fn receive_message(&mut self) -> Result<(MessageType, Self::Payload<'_>)> {
        FrameReceiver::receive_message(self)
    }
}

impl<W: Write> MessageSender for FrameSender<W> {
    fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()> {
        FrameSender::send_message(self, msg_type, payload)
    }
}

impl<R: Read, W: Write> MessageReceiver for Channel<R, W> {
    type Payload<'a>
        = PayloadReader<'a, R>
    where
        Self: 'a;

    fn receive_message(&mut self) -> Result<(MessageType, Self::Payload<'_>)> {
        Channel::receive_message(self)
    }
}

impl<R: Read, W: Write> MessageSender for Channel<R, W> {
    fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()> {
        Channel::send_message(self, msg_type, payload)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::FrameError;

    /// Relay every message from `source` to `sink` until the source ends.
    fn relay<S: MessageReceiver, T: MessageSender>(source: &mut S, sink: &mut T) -> Result<usize> {
        let mut relayed = 0;
        loop {
            let (msg_type, mut payload) = match source.receive_message() {
                Ok(message) => message,
                Err(FrameError::ConnectionClosed) => return Ok(relayed),
                Err(err) => return Err(err),
            };
            let mut body = Vec::new();
            payload.read_to_end(&mut body)?;
            sink.send_message(msg_type, &body)?;
            relayed += 1;
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Vec<(MessageType, Vec<u8>)>,
    }

    impl MessageSender for RecordingSender {
        fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()> {
            self.sent.push((msg_type, payload.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn generic_code_drives_frame_halves() {
        let mut wire = Vec::<u8>::new();
        let mut sender = FrameSender::new(&mut wire);
        MessageSender::send_message(&mut sender, MessageType::LOG, b"one").unwrap();
        MessageSender::send_message(&mut sender, MessageType::SHUTDOWN, b"").unwrap();

        let mut receiver = FrameReceiver::new(Cursor::new(wire));
        let mut recorder = RecordingSender::default();
        assert_eq!(relay(&mut receiver, &mut recorder).unwrap(), 2);

        assert_eq!(
            recorder.sent,
            vec![
                (MessageType::LOG, b"one".to_vec()),
                (MessageType::SHUTDOWN, Vec::new()),
            ]
        );
    }

    #[test]
    fn channel_implements_both_contracts() {
        let mut wire = Vec::<u8>::new();
        FrameSender::new(&mut wire)
            .send_message(MessageType::CONFIGURE, b"{}")
            .unwrap();

        let mut upstream = Channel::new(Cursor::new(wire), Vec::<u8>::new());
        let mut downstream = Channel::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());
        assert_eq!(relay(&mut upstream, &mut downstream).unwrap(), 1);

        let (_, relayed) = downstream.split();
        assert_eq!(relayed.get_ref().as_slice(), &[1, 0, 0, 0, 2, 0, 0, 0, b'{', b'}']);
    }
}

use std::io::{self, ErrorKind, Write};

use tracing::{debug, trace};
use workerpipe_transport::Close;
#[cfg(unix)]
use workerpipe_transport::IpcStream;

use crate::codec::{check_payload_len, Frame, FrameConfig, FrameHeader};
use crate::error::{FrameError, Result};
use crate::message::MessageType;

/// The send half of a framed channel.
///
/// Each [`send_message`](Self::send_message) writes one complete frame and
/// flushes. Nothing is remembered between calls. If a write fails partway the
/// bytes already written cannot be taken back: the stream is no longer
/// frame-aligned and the channel should be closed.
///
/// One caller at a time: there is no internal locking.
pub struct FrameSender<W> {
    inner: W,
    config: FrameConfig,
}

impl<W: Write> FrameSender<W> {
    /// Create a new sender with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new sender with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Frame and send a message. An empty payload sends a header with length 0.
    ///
    /// Payloads over `max_payload_size` are rejected before anything is written.
    pub fn send_message(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<()> {
        let length = check_payload_len(payload.len(), self.config.max_payload_size)?;
        let header = FrameHeader { msg_type, length };

        write_all(&mut self.inner, &header.encode())?;
        if !payload.is_empty() {
            write_all(&mut self.inner, payload)?;
        }
        self.flush()?;

        trace!(msg_type = %msg_type, size = length, "sent frame");
        Ok(())
    }

    /// Write a complete in-memory frame.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send_message(frame.msg_type, frame.payload.as_ref())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Writing to it directly desynchronizes the framing.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the sender and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Update maximum payload size for subsequent sends.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current sender configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<W: Close> FrameSender<W> {
    /// Close the underlying stream.
    pub fn close(self) -> io::Result<()> {
        debug!("closing send stream");
        self.inner.close()
    }
}

#[cfg(unix)]
impl FrameSender<IpcStream> {
    /// Create a sender for `IpcStream` and apply write timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<W> std::fmt::Debug for FrameSender<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSender")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn write_all<W: Write>(inner: &mut W, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match inner.write(buf) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, HEADER_SIZE};

    fn written(sender: FrameSender<Cursor<Vec<u8>>>) -> BytesMut {
        BytesMut::from(sender.into_inner().into_inner().as_slice())
    }

    #[test]
    fn write_single_frame() {
        let mut sender = FrameSender::new(Cursor::new(Vec::<u8>::new()));
        sender
            .send_message(MessageType::CONFIGURE, br#"{"port":8080}"#)
            .unwrap();

        let mut wire = written(sender);
        let frame = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(frame.msg_type, MessageType::CONFIGURE);
        assert_eq!(frame.payload.as_ref(), br#"{"port":8080}"#);
        assert!(wire.is_empty());
    }

    #[test]
    fn empty_payload_writes_header_only() {
        let mut sender = FrameSender::new(Cursor::new(Vec::<u8>::new()));
        sender.send_message(MessageType::LOG, &[]).unwrap();

        let wire = written(sender);
        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(wire.as_ref(), &[4, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn write_multiple_frames_in_order() {
        let mut sender = FrameSender::new(Cursor::new(Vec::<u8>::new()));
        sender.send_message(MessageType::CONFIGURE, b"one").unwrap();
        sender
            .send_frame(&Frame::empty(MessageType::SHUTDOWN))
            .unwrap();
        sender.send_message(MessageType::new(9000), b"three").unwrap();

        let mut wire = written(sender);
        let f1 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let f3 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();

        assert_eq!(f1, Frame::new(MessageType::CONFIGURE, b"one".to_vec()));
        assert_eq!(f2, Frame::empty(MessageType::SHUTDOWN));
        assert_eq!(f3, Frame::new(MessageType::new(9000), b"three".to_vec()));
    }

    #[test]
    fn payload_too_large_rejected_before_writing() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut sender = FrameSender::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = sender
            .send_message(MessageType::CONFIGURE, b"oversized")
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 4 }));
        assert!(written(sender).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut sender = FrameSender::new(sink);

        sender.send_message(MessageType::LOG, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut sender = FrameSender::new(InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        });
        sender.send_message(MessageType::LOG, b"retry").unwrap();

        let inner = sender.into_inner();
        assert_eq!(inner.data.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut sender = FrameSender::new(ZeroWriter);
        let err = sender.send_message(MessageType::LOG, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn failure_after_header_surfaces_io_error() {
        let mut sender = FrameSender::new(FailAfter {
            budget: HEADER_SIZE,
            data: Vec::new(),
        });

        let err = sender
            .send_message(MessageType::CONFIGURE, b"payload")
            .unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
        assert_eq!(sender.get_ref().data.len(), HEADER_SIZE);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut sender = FrameSender::new(Cursor::new(Vec::<u8>::new()));
        sender.set_max_payload_size(8);
        assert_eq!(sender.config().max_payload_size, 8);

        let _ = sender.get_ref();
        let _ = sender.get_mut();
        let _inner = sender.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn applies_write_timeout_for_ipc_stream() {
        let (left, _right) = IpcStream::pair().unwrap();
        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        let sender = FrameSender::with_config_ipc(left, cfg);
        assert!(sender.is_ok());
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Accepts `budget` bytes, then fails like a pipe whose reader went away.
    struct FailAfter {
        budget: usize,
        data: Vec<u8>,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::from(ErrorKind::BrokenPipe));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

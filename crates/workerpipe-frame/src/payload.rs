use std::fmt;
use std::io::{self, ErrorKind, Read};

use crate::state::RecvState;

/// Upper bound on the up-front allocation in [`PayloadReader::read_to_vec`].
/// The declared length comes off the wire and is not trusted for allocation.
const MAX_PREALLOC: usize = 64 * 1024;

/// A reader bounded to exactly one frame's payload.
///
/// Reads never go past the declared length: once it is consumed, `read`
/// returns `Ok(0)` even if the stream holds more bytes (they belong to the
/// next frame). Every byte handed out is deducted from the receiver's
/// [`RecvState`], so the receiver knows whether the payload was drained.
///
/// If the underlying stream ends while payload bytes are still owed, `read`
/// fails with [`ErrorKind::UnexpectedEof`].
pub struct PayloadReader<'a, R> {
    inner: &'a mut R,
    state: &'a mut RecvState,
    declared_len: u32,
}

impl<'a, R: Read> PayloadReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, state: &'a mut RecvState, declared_len: u32) -> Self {
        Self {
            inner,
            state,
            declared_len,
        }
    }

    /// Length from the frame header.
    pub fn declared_len(&self) -> u32 {
        self.declared_len
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> u32 {
        self.state.remaining()
    }

    pub fn is_drained(&self) -> bool {
        self.state.is_idle()
    }

    /// Read the rest of the payload into a vector.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity((self.remaining() as usize).min(MAX_PREALLOC));
        self.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Skip the rest of the payload. Returns the number of bytes skipped.
    pub fn discard(mut self) -> io::Result<u64> {
        io::copy(&mut self, &mut io::sink())
    }
}

impl<R: Read> Read for PayloadReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.state.remaining() as usize;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let limit = buf.len().min(remaining);
        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("stream ended with {remaining} payload bytes outstanding"),
            ));
        }

        self.state.consume(n);
        Ok(n)
    }
}

impl<R> fmt::Debug for PayloadReader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadReader")
            .field("declared_len", &self.declared_len)
            .field("remaining", &self.state.remaining())
            .finish()
    }
}

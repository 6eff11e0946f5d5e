use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::{close_fd, Close};

/// A connected duplex IPC stream, usable as both `Read` and `Write`.
///
/// Wraps a Unix domain socket. Unlike a pipe pair, one `IpcStream` carries
/// both directions, so a framing channel built on it holds two handles to
/// the same socket (see [`IpcStream::try_clone`]). It also supports read and
/// write deadlines, which anonymous pipes do not.
pub struct IpcStream {
    inner: UnixStream,
}

impl IpcStream {
    /// Create a connected pair of streams, one for each side of the connection.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair().map_err(TransportError::SocketPair)?;
        Ok((Self::from(left), Self::from(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from(cloned))
    }
}

impl From<UnixStream> for IpcStream {
    fn from(inner: UnixStream) -> Self {
        Self { inner }
    }
}

impl From<IpcStream> for OwnedFd {
    fn from(stream: IpcStream) -> Self {
        OwnedFd::from(stream.inner)
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl Close for IpcStream {
    fn close(self) -> std::io::Result<()> {
        close_fd(OwnedFd::from(self))
    }
}

impl AsFd for IpcStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl AsRawFd for IpcStream {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("type", &"unix")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

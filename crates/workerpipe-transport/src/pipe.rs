use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::process::{ChildStderr, ChildStdin, ChildStdout, Stdio};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{close_fd, Close};

/// Create an anonymous pipe.
///
/// Both descriptors are created close-on-exec; hand one of them to a child
/// through [`Stdio`] (`Stdio::from(reader)`) and it is inherited only as that
/// child's stdin/stdout.
pub fn pipe() -> Result<(PipeReader, PipeWriter)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    {
        // SAFETY: `fds` is a valid, writable array of two c_ints.
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
        if rc != 0 {
            return Err(TransportError::Pipe(std::io::Error::last_os_error()));
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    {
        // SAFETY: `fds` is a valid, writable array of two c_ints.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(TransportError::Pipe(std::io::Error::last_os_error()));
        }
        for fd in fds {
            // SAFETY: `fd` was just returned by pipe(2) and is open.
            let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
            if rc == -1 {
                let err = std::io::Error::last_os_error();
                // SAFETY: both descriptors are open and owned only by this function.
                unsafe {
                    libc::close(fds[0]);
                    libc::close(fds[1]);
                }
                return Err(TransportError::Pipe(err));
            }
        }
    }

    // SAFETY: pipe(2) returned two fresh descriptors that nothing else owns.
    let (read_fd, write_fd) = unsafe {
        (
            OwnedFd::from_raw_fd(fds[0]),
            OwnedFd::from_raw_fd(fds[1]),
        )
    };
    debug!(read_fd = fds[0], write_fd = fds[1], "created anonymous pipe");

    Ok((PipeReader::from(read_fd), PipeWriter::from(write_fd)))
}

/// The read end of an anonymous pipe.
#[derive(Debug)]
pub struct PipeReader {
    file: File,
}

/// The write end of an anonymous pipe.
#[derive(Debug)]
pub struct PipeWriter {
    file: File,
}

impl PipeReader {
    /// Duplicate the descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }
}

impl PipeWriter {
    /// Duplicate the descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Close for PipeReader {
    fn close(self) -> std::io::Result<()> {
        close_fd(OwnedFd::from(self.file))
    }
}

impl Close for PipeWriter {
    fn close(self) -> std::io::Result<()> {
        close_fd(OwnedFd::from(self.file))
    }
}

impl From<OwnedFd> for PipeReader {
    fn from(fd: OwnedFd) -> Self {
        Self {
            file: File::from(fd),
        }
    }
}

impl From<OwnedFd> for PipeWriter {
    fn from(fd: OwnedFd) -> Self {
        Self {
            file: File::from(fd),
        }
    }
}

/// The supervisor reads what the worker writes to stdout.
impl From<ChildStdout> for PipeReader {
    fn from(stdout: ChildStdout) -> Self {
        Self::from(OwnedFd::from(stdout))
    }
}

impl From<ChildStderr> for PipeReader {
    fn from(stderr: ChildStderr) -> Self {
        Self::from(OwnedFd::from(stderr))
    }
}

/// The supervisor writes to the worker's stdin.
impl From<ChildStdin> for PipeWriter {
    fn from(stdin: ChildStdin) -> Self {
        Self::from(OwnedFd::from(stdin))
    }
}

impl From<PipeReader> for Stdio {
    fn from(reader: PipeReader) -> Self {
        Stdio::from(OwnedFd::from(reader.file))
    }
}

impl From<PipeWriter> for Stdio {
    fn from(writer: PipeWriter) -> Self {
        Stdio::from(OwnedFd::from(writer.file))
    }
}

impl AsFd for PipeReader {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsFd for PipeWriter {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for PipeReader {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

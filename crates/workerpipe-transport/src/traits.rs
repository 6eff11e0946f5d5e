use std::io;

/// An endpoint that can be closed explicitly, reporting the OS result.
///
/// Dropping a std stream closes its descriptor and silently discards any
/// error. Framing channels need to surface close failures, so every endpoint
/// they own goes through this trait instead.
pub trait Close {
    /// Release the endpoint. The endpoint is gone even when an error is returned.
    fn close(self) -> io::Result<()>;
}

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io;
    use std::os::fd::{IntoRawFd, OwnedFd};
    use std::os::unix::net::UnixStream;
    use std::process::{ChildStderr, ChildStdin, ChildStdout};

    use super::Close;

    /// Close an owned descriptor with `close(2)` and report its result.
    pub(crate) fn close_fd(fd: OwnedFd) -> io::Result<()> {
        let raw = fd.into_raw_fd();
        // SAFETY: `raw` was just released from an `OwnedFd`, so this process owns
        // it exclusively and nothing else will close it again.
        let rc = unsafe { libc::close(raw) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        // The descriptor is released on EINTR as well; retrying could close a reused fd.
        if err.kind() == io::ErrorKind::Interrupted {
            Ok(())
        } else {
            Err(err)
        }
    }

    macro_rules! close_via_owned_fd {
        ($($ty:ty),* $(,)?) => {
            $(
                impl Close for $ty {
                    fn close(self) -> io::Result<()> {
                        close_fd(OwnedFd::from(self))
                    }
                }
            )*
        };
    }

    close_via_owned_fd!(OwnedFd, File, UnixStream, ChildStdin, ChildStdout, ChildStderr);
}

#[cfg(unix)]
pub(crate) use unix::close_fd;

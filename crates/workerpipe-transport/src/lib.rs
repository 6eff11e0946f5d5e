//! IPC endpoints for a supervisor talking to a worker subprocess.
//!
//! Provides the byte streams the framing layer runs over:
//! - Anonymous pipes ([`pipe`], [`PipeReader`], [`PipeWriter`]), including
//!   conversions from a spawned child's stdio handles
//! - A duplex Unix socket stream ([`IpcStream`]) with read/write deadlines
//!
//! Every endpoint implements [`Close`], which releases the descriptor and
//! reports the result of `close(2)` instead of discarding it on drop.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod stream;

pub use error::{Result, TransportError};
pub use traits::Close;

#[cfg(unix)]
pub use pipe::{pipe, PipeReader, PipeWriter};
#[cfg(unix)]
pub use stream::IpcStream;

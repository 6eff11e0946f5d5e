//! Framed message channel between a supervisor process and the worker
//! subprocess it spawns.
//!
//! # Crate Structure
//!
//! - [`transport`]: pipes, socket pairs and the [`Close`](transport::Close) trait
//! - [`frame`]: the `[type][length][payload]` framing, receive cursor and channel
//! - [`messages`]: JSON bodies for the reserved control messages

/// Re-export transport types.
pub mod transport {
    pub use workerpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use workerpipe_frame::*;
}

pub mod messages;

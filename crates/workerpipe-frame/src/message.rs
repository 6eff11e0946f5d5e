//! Message type tags.
//!
//! Values 0-4 are reserved for the supervisor/worker control protocol. Any
//! other value is legal on the wire and passes through the framing layer
//! untouched; only collaborators decide what it means.

use std::fmt;
use std::str::FromStr;

/// The 32-bit type tag carried in every frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageType(pub u32);

impl MessageType {
    /// Sentinel; never a real payload-bearing message.
    pub const NONE: Self = Self(0);
    /// Supervisor → worker: configuration document.
    pub const CONFIGURE: Self = Self(1);
    /// Worker → supervisor: outcome of a CONFIGURE.
    pub const CONFIGURE_RESULT: Self = Self(2);
    /// Supervisor → worker: request graceful termination.
    pub const SHUTDOWN: Self = Self(3);
    /// Worker → supervisor: a log record.
    pub const LOG: Self = Self(4);

    /// Highest reserved value.
    pub const LAST_RESERVED: Self = Self::LOG;

    /// Wrap a raw tag.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The raw tag.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Human-readable name, or `"UNRESERVED"` for application-defined tags.
    pub fn name(self) -> &'static str {
        match self {
            Self::NONE => "NONE",
            Self::CONFIGURE => "CONFIGURE",
            Self::CONFIGURE_RESULT => "CONFIGURE_RESULT",
            Self::SHUTDOWN => "SHUTDOWN",
            Self::LOG => "LOG",
            _ => "UNRESERVED",
        }
    }

    /// Returns true for the protocol's own tags (0-4).
    pub fn is_reserved(self) -> bool {
        self <= Self::LAST_RESERVED
    }
}

impl From<u32> for MessageType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<MessageType> for u32 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reserved() {
            f.write_str(self.name())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Returned when a string is neither a reserved name nor a decimal tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message type '{0}' (expected a reserved name or an unsigned 32-bit number)")]
pub struct ParseMessageTypeError(String);

impl FromStr for MessageType {
    type Err = ParseMessageTypeError;

    /// Accepts reserved names in any case, with `-` or `_` separators
    /// (`configure-result`, `CONFIGURE_RESULT`), or a decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "NONE" => Ok(Self::NONE),
            "CONFIGURE" => Ok(Self::CONFIGURE),
            "CONFIGURE_RESULT" => Ok(Self::CONFIGURE_RESULT),
            "SHUTDOWN" => Ok(Self::SHUTDOWN),
            "LOG" => Ok(Self::LOG),
            _ => trimmed
                .parse::<u32>()
                .map(Self)
                .map_err(|_| ParseMessageTypeError(s.to_string())),
        }
    }
}

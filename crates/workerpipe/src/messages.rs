//! JSON bodies for the reserved control messages.
//!
//! The framing layer treats every payload as opaque bytes. These types give
//! the CONFIGURE_RESULT and LOG payloads a shared shape for both ends.

use std::io::{self, Read};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors from encoding or decoding a message body.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("invalid message body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed reading message body: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// Worker's answer to a CONFIGURE message.
///
/// Success is `{"error": null}`; the field is always present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResult {
    pub error: Option<String>,
}

impl ConfigureResult {
    pub fn ok() -> Self {
        Self { error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, yielding the worker's error message on failure.
    pub fn into_result(self) -> std::result::Result<(), String> {
        match self.error {
            None => Ok(()),
            Some(message) => Err(message),
        }
    }
}

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Body of a LOG message sent by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }
}

/// Serialize a message body.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Read a payload to its end and deserialize it.
///
/// Pass a [`PayloadReader`](workerpipe_frame::PayloadReader) directly: it is
/// drained as a side effect, so the next message can be received even if
/// parsing fails.
pub fn decode_json<T: DeserializeOwned>(payload: &mut impl Read) -> Result<T> {
    let mut body = Vec::new();
    payload.read_to_end(&mut body)?;
    Ok(serde_json::from_slice(&body)?)
}

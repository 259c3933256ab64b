//! Response handling error types.
//!
//! None of these reach the user directly. Malformed tool calls and implausible
//! paths are logged and dropped; stream errors are reported once by the chat
//! session and end the response.

use thiserror::Error;

/// Errors raised while reading model output.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// A tool-call tag pair was found but its contents were unusable.
    #[error("malformed {tag} tool call: {reason}")]
    MalformedToolCall { tag: &'static str, reason: String },

    /// A candidate file target failed the plausibility check.
    #[error("implausible file path: '{path}'")]
    InvalidPath { path: String },

    /// A request id string did not have the `req_<millis>_<suffix>` shape.
    #[error("invalid request id: '{raw}'")]
    InvalidRequestId { raw: String },

    /// The chat transport failed before the response completed.
    #[error("response stream error: {reason}")]
    StreamError { reason: String },
}

impl ResponseError {
    /// Whether this error means the response was cut short rather than malformed.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, ResponseError::StreamError { .. })
    }
}

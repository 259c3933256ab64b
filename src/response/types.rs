//! Shared types for response handling.
//!
//! `Recommendation` is what the extractor produces and the store holds.
//! `RequestId` scopes one chat turn; it embeds its creation time so pending
//! recommendations can be expired without a separate timestamp table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::ResponseError;

// ─── Recommendation ──────────────────────────────────────────────────────────

/// A 1-based inclusive line range attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Build a range, swapping the bounds if they arrive reversed.
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }
}

/// A code block proposed for writing to `file_path`, pending user confirmation.
///
/// Invariants (upheld by the extractor): `file_path` passes
/// [`is_valid_path`](super::path_classifier::is_valid_path) and `code` is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub file_path: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Line range named in the block header or path comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_numbers: Option<LineRange>,
}

// ─── Request ID ──────────────────────────────────────────────────────────────

const REQUEST_ID_PREFIX: &str = "req_";

/// Opaque identifier for one submitted chat turn: `req_<unix-millis>_<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId {
    raw: String,
    timestamp_ms: i64,
}

impl RequestId {
    /// Mint a fresh id stamped with the current time.
    pub fn new() -> Self {
        Self::with_timestamp(chrono::Utc::now().timestamp_millis())
    }

    /// Mint an id carrying an explicit timestamp (unix milliseconds).
    pub fn with_timestamp(timestamp_ms: i64) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            raw: format!("{REQUEST_ID_PREFIX}{timestamp_ms}_{}", &suffix[..8]),
            timestamp_ms,
        }
    }

    /// Parse an id received back from the UI.
    pub fn parse(raw: &str) -> Result<Self, ResponseError> {
        let invalid = || ResponseError::InvalidRequestId {
            raw: raw.to_string(),
        };

        let rest = raw.strip_prefix(REQUEST_ID_PREFIX).ok_or_else(invalid)?;
        let (millis, suffix) = rest.split_once('_').ok_or_else(invalid)?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }

        let timestamp_ms = millis.parse::<i64>().map_err(|_| invalid())?;
        Ok(Self {
            raw: raw.to_string(),
            timestamp_ms,
        })
    }

    /// Creation time in unix milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Age relative to `now_ms`, clamped at zero for ids minted "in the future".
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.timestamp_ms).max(0)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for RequestId {
    type Err = ResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = ResponseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.raw
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

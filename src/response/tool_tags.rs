//! Inline tool-call tags: `<read_file>`, `<write_file>`, `<open_file>`.
//!
//! The model requests file actions by wrapping a path (and, for writes, the
//! new content) in a tag pair:
//! ```text
//! <read_file>src/main.rs</read_file>
//! <open_file>README.md</open_file>
//! <write_file>src/lib.rs
//! pub mod app;
//! </write_file>
//! ```
//! This module knows the tag vocabulary and turns the inner text of a balanced
//! pair into a [`ToolCall`]. Both the streaming interpreter and the
//! post-response extractor build on it.

use serde::Serialize;

use super::errors::ResponseError;
use super::path_classifier::is_valid_path;

// ─── Tag Vocabulary ──────────────────────────────────────────────────────────

/// Which file action a tag pair requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    OpenFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::ReadFile, ToolKind::WriteFile, ToolKind::OpenFile];

    pub fn tag_name(self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::OpenFile => "open_file",
        }
    }

    pub fn open_tag(self) -> &'static str {
        match self {
            ToolKind::ReadFile => "<read_file>",
            ToolKind::WriteFile => "<write_file>",
            ToolKind::OpenFile => "<open_file>",
        }
    }

    pub fn close_tag(self) -> &'static str {
        match self {
            ToolKind::ReadFile => "</read_file>",
            ToolKind::WriteFile => "</write_file>",
            ToolKind::OpenFile => "</open_file>",
        }
    }
}

/// Substrings that only show up when tag markup leaked into a candidate path.
pub const TAG_FRAGMENTS: &[&str] = &[
    "<read_file",
    "<write_file",
    "<open_file",
    "read_file>",
    "write_file>",
    "open_file>",
    "</",
];

/// A validated file action requested by the model. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    OpenFile { path: String },
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::ReadFile { .. } => ToolKind::ReadFile,
            ToolCall::WriteFile { .. } => ToolKind::WriteFile,
            ToolCall::OpenFile { .. } => ToolKind::OpenFile,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ToolCall::ReadFile { path }
            | ToolCall::WriteFile { path, .. }
            | ToolCall::OpenFile { path } => path,
        }
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Build a [`ToolCall`] from the inner text of a balanced tag pair.
///
/// The inner text is trimmed first. Reads and opens take the whole inner text
/// as the path. Writes take the first line as the path and the remainder as
/// content; a single fenced block wrapping that content is unwrapped.
pub fn parse_tool_call(kind: ToolKind, inner: &str) -> Result<ToolCall, ResponseError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(ResponseError::MalformedToolCall {
            tag: kind.tag_name(),
            reason: "empty content".into(),
        });
    }

    match kind {
        ToolKind::ReadFile | ToolKind::OpenFile => {
            let path = validated_path(inner)?;
            Ok(if kind == ToolKind::ReadFile {
                ToolCall::ReadFile { path }
            } else {
                ToolCall::OpenFile { path }
            })
        }
        ToolKind::WriteFile => {
            let (first_line, rest) =
                inner
                    .split_once('\n')
                    .ok_or_else(|| ResponseError::MalformedToolCall {
                        tag: kind.tag_name(),
                        reason: "missing content after path line".into(),
                    })?;
            let path = validated_path(first_line.trim())?;
            Ok(ToolCall::WriteFile {
                path,
                content: unwrap_fenced_content(rest).to_string(),
            })
        }
    }
}

fn validated_path(candidate: &str) -> Result<String, ResponseError> {
    if is_valid_path(candidate) {
        Ok(candidate.to_string())
    } else {
        Err(ResponseError::InvalidPath {
            path: candidate.to_string(),
        })
    }
}

/// Strip one fenced block that wraps the entire write content.
fn unwrap_fenced_content(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return content;
    }
    let Some(body_start) = trimmed.find('\n') else {
        return content;
    };
    let without_close = &trimmed[..trimmed.len() - 3];
    if body_start >= without_close.len() {
        return content;
    }
    without_close[body_start + 1..].trim_end_matches([' ', '\t']).trim_end_matches('\n')
}

// ─── Scanning ────────────────────────────────────────────────────────────────

/// Find the earliest opening tag of any kind: `(byte_offset, kind)`.
pub fn find_opening_tag(text: &str) -> Option<(usize, ToolKind)> {
    ToolKind::ALL
        .iter()
        .filter_map(|kind| text.find(kind.open_tag()).map(|pos| (pos, *kind)))
        .min_by_key(|(pos, _)| *pos)
}

/// Length in bytes of the longest suffix of `text` that could still grow into
/// an opening tag (e.g. `"… see <read_fi"` → 8).
pub fn partial_open_tag_len(text: &str) -> usize {
    ToolKind::ALL
        .iter()
        .map(|kind| {
            let tag = kind.open_tag();
            (1..tag.len())
                .rev()
                .find(|&len| text.ends_with(&tag[..len]))
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

/// A complete tag pair found in finished text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan<'a> {
    pub kind: ToolKind,
    /// Text between the opening and closing tags, untrimmed.
    pub inner: &'a str,
}

/// Collect every balanced tag pair in `text`, in order.
///
/// Scanning stops at the first opening tag that never closes. An opening tag
/// of a different kind inside a pair is part of that pair's inner text.
pub fn find_tag_spans(text: &str) -> Vec<TagSpan<'_>> {
    let mut spans = Vec::new();
    let mut search_from = 0;

    while let Some((offset, kind)) = find_opening_tag(&text[search_from..]) {
        let inner_start = search_from + offset + kind.open_tag().len();
        let Some(close_offset) = text[inner_start..].find(kind.close_tag()) else {
            break;
        };
        let inner_end = inner_start + close_offset;
        spans.push(TagSpan {
            kind,
            inner: &text[inner_start..inner_end],
        });
        search_from = inner_end + kind.close_tag().len();
    }

    spans
}

/// Find a tag embedded in a short piece of text (a fence header), tolerating
/// truncation: the `<` may be missing and the closing tag may be absent or cut
/// off. Returns the kind and the text after the tag up to the next `<`.
pub fn find_embedded_tag(text: &str) -> Option<(ToolKind, &str)> {
    let (pos, kind) = ToolKind::ALL
        .iter()
        .filter_map(|kind| {
            let needle = &kind.open_tag()[1..];
            text.find(needle).map(|pos| (pos, *kind))
        })
        .min_by_key(|(pos, _)| *pos)?;

    let after = &text[pos + kind.open_tag().len() - 1..];
    let inner = after.split('<').next().unwrap_or("");
    Some((kind, inner))
}

/// Whether `text` begins with an opening tag of any kind.
pub fn starts_with_tool_markup(text: &str) -> bool {
    ToolKind::ALL
        .iter()
        .any(|kind| text.starts_with(kind.open_tag()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

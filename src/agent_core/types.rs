//! Shared types for the agent core.
//!
//! Apply targets and per-file apply outcomes exchanged between the executor,
//! the chat session and the UI.

use serde::{Deserialize, Serialize};

/// User-visible message for an apply or reject against an unknown request.
pub const NO_RECOMMENDATIONS_FOUND: &str = "No recommendations found";

// ─── Apply Target ───────────────────────────────────────────────────────────

/// What an apply request covers: every pending file, or one exact path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyTarget {
    All,
    File(String),
}

impl ApplyTarget {
    /// `"*"` means every pending recommendation; anything else is a path.
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "*" {
            ApplyTarget::All
        } else {
            ApplyTarget::File(raw.to_string())
        }
    }
}

impl From<&str> for ApplyTarget {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

// ─── Apply Result ───────────────────────────────────────────────────────────

/// Outcome of applying one recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub file_path: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyResult {
    pub fn success(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ok: true,
            error: None,
        }
    }

    pub fn failure(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ok: false,
            error: Some(error.into()),
        }
    }

    /// The store had nothing matching; no file was touched.
    pub fn not_found(file_path: impl Into<String>) -> Self {
        Self::failure(file_path, NO_RECOMMENDATIONS_FOUND)
    }

    pub fn is_not_found(&self) -> bool {
        !self.ok && self.error.as_deref() == Some(NO_RECOMMENDATIONS_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_target_parse() {
        assert_eq!(ApplyTarget::parse("*"), ApplyTarget::All);
        assert_eq!(ApplyTarget::from("main.go"), ApplyTarget::File("main.go".into()));
    }

    #[test]
    fn test_apply_result_serialization() {
        let ok = serde_json::to_value(ApplyResult::success("a.rs")).unwrap();
        assert_eq!(ok, serde_json::json!({"filePath": "a.rs", "ok": true}));

        let missing = ApplyResult::not_found("x.py");
        assert!(missing.is_not_found());
        assert!(!ApplyResult::failure("x.py", "disk full").is_not_found());
    }
}

//! ChatEdit configuration (`.chatedit/config.yaml`).
//!
//! Every field has a default, so a missing or partial file is fine. String
//! values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`; defaults get a leading `~` expanded.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::agent_core::recommendations::DEFAULT_RECOMMENDATION_TTL;
use crate::agent_core::AgentError;
use crate::response::extractor::DEFAULT_COMMENT_SCAN_LINES;

/// Config file location relative to a project directory.
pub const CONFIG_RELATIVE_PATH: &str = ".chatedit/config.yaml";

/// Env var pointing directly at a config file.
pub const CONFIG_ENV_VAR: &str = "CHATEDIT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEditConfig {
    /// Directory file reads and writes are confined to.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,
    /// Minutes pending recommendations survive before a sweep removes them.
    #[serde(default = "default_ttl_minutes")]
    pub recommendation_ttl_minutes: u64,
    /// Command used to open files after apply (e.g. `code`). Optional.
    #[serde(default)]
    pub editor_command: Option<String>,
    /// Permit writes outside `workspace_root`.
    #[serde(default)]
    pub allow_outside_workspace: bool,
    /// Leading body lines searched for a path comment.
    #[serde(default = "default_comment_scan_lines")]
    pub max_comment_scan_lines: usize,
}

fn default_workspace_root() -> String {
    ".".into()
}
fn default_ttl_minutes() -> u64 {
    DEFAULT_RECOMMENDATION_TTL.as_secs() / 60
}
fn default_comment_scan_lines() -> usize {
    DEFAULT_COMMENT_SCAN_LINES
}

impl Default for ChatEditConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            recommendation_ttl_minutes: default_ttl_minutes(),
            editor_command: None,
            allow_outside_workspace: false,
            max_comment_scan_lines: default_comment_scan_lines(),
        }
    }
}

impl ChatEditConfig {
    /// Load and parse a config file, interpolating env vars first.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AgentError::ConfigError {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&raw)
    }

    /// Parse config YAML. An empty document yields the defaults.
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let interpolated = interpolate_env_vars(raw);
        if interpolated.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&interpolated)?)
    }

    /// Load from `path` if given, else search from the current directory.
    /// Falls back to defaults (with a log line) when nothing usable is found.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let resolved = match path {
            Some(p) => Ok(p.to_path_buf()),
            None => std::env::current_dir()
                .map_err(|e| AgentError::ConfigError {
                    reason: format!("cannot read current directory: {e}"),
                })
                .and_then(|cwd| find_config_path(&cwd)),
        };

        let loaded = resolved.and_then(|p| Self::load(&p).map(|config| (p, config)));
        match loaded {
            Ok((p, config)) => {
                tracing::info!(path = %p.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::info!(reason = %e, "using default config");
                Self::default()
            }
        }
    }

    /// `workspace_root` with `~` expanded.
    pub fn resolved_workspace_root(&self) -> PathBuf {
        expand_tilde(&self.workspace_root)
    }

    pub fn recommendation_ttl(&self) -> Duration {
        Duration::from_secs(self.recommendation_ttl_minutes.saturating_mul(60))
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// `CHATEDIT_CONFIG` wins if it names an existing file; otherwise searches
/// upward from `start` for `.chatedit/config.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, AgentError> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = expand_tilde(&explicit);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(AgentError::ConfigError {
        reason: format!("could not find {CONFIG_RELATIVE_PATH}"),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` references. Unset variables without
/// a default become empty; a `${` that never closes is left as written.
fn interpolate_env_vars(input: &str) -> String {
    static VAR_REF: OnceLock<Regex> = OnceLock::new();
    let re = VAR_REF.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var pattern is valid")
    });

    re.replace_all(input, |caps: &Captures<'_>| {
        let value = std::env::var(&caps[1]).ok();
        match (value, caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => expand_tilde(default.as_str())
                .to_string_lossy()
                .into_owned(),
            (None, None) => String::new(),
        }
    })
    .into_owned()
}

/// `~` or `~/rest` to the home directory. Anything else, including `~user`,
/// is returned as is.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home;
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatEditConfig::default();
        assert_eq!(config.workspace_root, ".");
        assert_eq!(config.recommendation_ttl_minutes, 30);
        assert_eq!(config.recommendation_ttl(), DEFAULT_RECOMMENDATION_TTL);
        assert_eq!(config.max_comment_scan_lines, 5);
        assert!(!config.allow_outside_workspace);
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let config = ChatEditConfig::parse("editor_command: code\nrecommendation_ttl_minutes: 5\n").unwrap();
        assert_eq!(config.editor_command.as_deref(), Some("code"));
        assert_eq!(config.recommendation_ttl(), Duration::from_secs(300));
        assert_eq!(config.workspace_root, ".");
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(ChatEditConfig::parse("").unwrap(), ChatEditConfig::default());
    }

    #[test]
    fn test_parse_invalid_yaml_errors() {
        let err = ChatEditConfig::parse("recommendation_ttl_minutes: [oops").unwrap_err();
        assert!(matches!(err, AgentError::ConfigError { .. }));
    }

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__CHATEDIT_TEST_UNSET__");
        let result = interpolate_env_vars("${__CHATEDIT_TEST_UNSET__:-/fallback/path}");
        assert_eq!(result, "/fallback/path");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__CHATEDIT_TEST_ROOT__", "/custom/ws");
        let config = ChatEditConfig::parse("workspace_root: ${__CHATEDIT_TEST_ROOT__:-.}").unwrap();
        assert_eq!(config.workspace_root, "/custom/ws");
        std::env::remove_var("__CHATEDIT_TEST_ROOT__");
    }

    #[test]
    fn test_find_config_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".chatedit");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.yaml"), "allow_outside_workspace: true\n").unwrap();

        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_path(&nested).unwrap();
        assert_eq!(found, config_dir.join("config.yaml"));

        let config = ChatEditConfig::load_or_default(Some(found.as_path()));
        assert!(config.allow_outside_workspace);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChatEditConfig::load_or_default(Some(dir.path().join("missing.yaml").as_path()));
        assert_eq!(config, ChatEditConfig::default());
    }

    #[test]
    fn test_interpolate_leaves_unclosed_reference() {
        assert_eq!(interpolate_env_vars("root: ${OPEN"), "root: ${OPEN");
        assert_eq!(interpolate_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/projects"), home.join("projects"));
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~alice/x"), PathBuf::from("~alice/x"));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}

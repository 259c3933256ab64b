//! File collaborator.
//!
//! `FileIo` is the seam the executor and chat session write through. The
//! local implementation resolves paths against a workspace root, refuses
//! paths that escape it, and writes atomically (temp file + rename).

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::errors::FileIoError;
use crate::config::{expand_tilde, ChatEditConfig};

/// Reads, writes, and opens files on behalf of the chat session.
#[async_trait]
pub trait FileIo: Send + Sync {
    async fn read(&self, path: &str) -> Result<String, FileIoError>;

    /// Write `content` to `path`, creating parent directories.
    async fn write(&self, path: &str, content: &str) -> Result<(), FileIoError>;

    /// Ask the editor to show `path`.
    async fn open_in_editor(&self, path: &str) -> Result<(), FileIoError>;
}

// ─── LocalFileIo ────────────────────────────────────────────────────────────

/// `FileIo` on the local disk via `tokio::fs`.
#[derive(Debug, Clone)]
pub struct LocalFileIo {
    root: PathBuf,
    editor_command: Option<String>,
    allow_outside_workspace: bool,
}

impl LocalFileIo {
    /// Confine file access to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: absolute_root(root.into()),
            editor_command: None,
            allow_outside_workspace: false,
        }
    }

    pub fn with_editor_command(mut self, command: impl Into<String>) -> Self {
        self.editor_command = Some(command.into());
        self
    }

    pub fn allow_outside_workspace(mut self, allow: bool) -> Self {
        self.allow_outside_workspace = allow;
        self
    }

    pub fn from_config(config: &ChatEditConfig) -> Self {
        let io = Self::new(config.resolved_workspace_root())
            .allow_outside_workspace(config.allow_outside_workspace);
        match &config.editor_command {
            Some(command) if !command.trim().is_empty() => io.with_editor_command(command.trim()),
            _ => io,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path to an absolute path inside the workspace.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, FileIoError> {
        let expanded = expand_tilde(path);
        let joined = if expanded.is_absolute() {
            expanded
        } else {
            self.root.join(expanded)
        };
        let normalized = normalize(&joined);
        if self.allow_outside_workspace {
            return Ok(normalized);
        }

        // Symlinks inside the workspace may point anywhere; check where the
        // path really lands.
        let real = resolve_symlinks(&normalized);
        if !real.starts_with(&self.root) {
            tracing::warn!(
                path,
                resolved = %real.display(),
                root = %self.root.display(),
                "refusing path outside workspace"
            );
            return Err(FileIoError::OutsideWorkspace {
                path: path.to_string(),
            });
        }
        Ok(real)
    }
}

#[async_trait]
impl FileIo for LocalFileIo {
    async fn read(&self, path: &str) -> Result<String, FileIoError> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| FileIoError::from_io(path, e))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), FileIoError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileIoError::from_io(path, e))?;
        }

        let file_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileIoError::Io {
                path: path.to_string(),
                reason: "path has no file name".into(),
            })?;
        let tmp_path = resolved.with_file_name(format!(".{file_name}.chatedit.tmp"));

        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| FileIoError::from_io(path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &resolved).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(FileIoError::from_io(path, e));
        }

        tracing::info!(path, bytes = content.len(), "file written");
        Ok(())
    }

    async fn open_in_editor(&self, path: &str) -> Result<(), FileIoError> {
        let command = self.editor_command.as_deref().ok_or_else(|| FileIoError::Editor {
            reason: "no editor command configured".into(),
        })?;
        let resolved = self.resolve(path)?;

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| FileIoError::Editor {
            reason: "empty editor command".into(),
        })?;

        tokio::process::Command::new(program)
            .args(parts)
            .arg(&resolved)
            .spawn()
            .map_err(|e| FileIoError::Editor {
                reason: format!("failed to launch '{program}': {e}"),
            })?;

        tracing::debug!(path, editor = program, "opened in editor");
        Ok(())
    }
}

// ─── Path Helpers ───────────────────────────────────────────────────────────

fn absolute_root(root: PathBuf) -> PathBuf {
    let root = expand_tilde(&root.to_string_lossy());
    let absolute = if root.is_absolute() {
        root
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&root))
            .unwrap_or(root)
    };
    resolve_symlinks(&normalize(&absolute))
}

/// Canonicalize the deepest ancestor of `path` that exists, then re-append
/// the components that do not exist yet. `path` must already be normalized.
fn resolve_symlinks(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing: Vec<&OsStr> = Vec::new();
    loop {
        if let Ok(real) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(real, |acc, part| acc.join(part));
        }
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Lexically resolve `.` and `..` without touching the disk (the target may
/// not exist yet).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────────────

//! File collaborator error types.

use thiserror::Error;

/// Errors from reading, writing, or opening a file.
#[derive(Debug, Error)]
pub enum FileIoError {
    /// The file does not exist.
    #[error("file not found: '{path}'")]
    NotFound { path: String },

    /// The path resolves outside the workspace root.
    #[error("path escapes the workspace: '{path}'")]
    OutsideWorkspace { path: String },

    /// Any other I/O failure.
    #[error("I/O error on '{path}': {reason}")]
    Io { path: String, reason: String },

    /// No editor configured, or the editor failed to launch.
    #[error("editor error: {reason}")]
    Editor { reason: String },
}

impl FileIoError {
    /// Map a `std::io::Error` for `path`, keeping not-found distinct.
    pub fn from_io(path: &str, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileIoError::NotFound {
                path: path.to_string(),
            }
        } else {
            FileIoError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = FileIoError::from_io(
            "a.rs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, FileIoError::NotFound { .. }));

        let err = FileIoError::from_io(
            "a.rs",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error on 'a.rs': denied");
    }
}

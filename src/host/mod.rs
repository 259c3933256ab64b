//! Host collaborators: the file system and the chat UI.
//!
//! Submodules:
//! - `file_io`: `FileIo` trait plus `LocalFileIo`, confined to a workspace root
//! - `notifications`: `NotificationSink` trait plus `ChannelSink`, which turns
//!   notifications into serializable `ChatEvent`s
//! - `errors`: File collaborator error types

pub mod errors;
pub mod file_io;
pub mod notifications;

// Re-exports for convenience
pub use errors::FileIoError;
pub use file_io::{FileIo, LocalFileIo};
pub use notifications::{ChannelSink, ChatEvent, NotificationSink};

//! chatedit: turns a streamed model response into reviewable file edits.
//!
//! - `response`: reads model output (tool-call tags, fenced code blocks, path checks)
//! - `agent_core`: stores recommendations and applies them on request
//! - `host`: the file system and UI collaborators
//! - `config` / `logging`: ambient setup for the CLI and embedders

pub mod agent_core;
pub mod config;
pub mod host;
pub mod logging;
pub mod response;

pub use agent_core::{ApplyResult, ApplyTarget, ChatSession};
pub use config::ChatEditConfig;
pub use host::{ChannelSink, ChatEvent, FileIo, LocalFileIo, NotificationSink};
pub use response::{Recommendation, RequestId};

/// Async mutex for state shared across `.await` points.
pub type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Return the platform-standard data directory for chatedit.
///
/// - macOS: `~/Library/Application Support/chatedit/`
/// - Windows: `{FOLDERID_RoamingAppData}\chatedit\`
/// - Linux: `$XDG_DATA_HOME/chatedit/` (fallback `~/.local/share/chatedit`)
///
/// Falls back to `~/.chatedit/` only if none of the above can be resolved.
pub fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("chatedit");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".chatedit")
}

//! Agent Core: what happens to a response after it has been read.
//!
//! Submodules:
//! - `recommendations`: Pending recommendations keyed by request id, with TTL sweep
//! - `executor`: Applies or rejects pending recommendations through `FileIo`
//! - `chat_session`: Entry points the UI drives (chunks, finalize, apply, reject)
//! - `types`: Apply targets and per-file apply results
//! - `errors`: Agent-level error types

pub mod chat_session;
pub mod errors;
pub mod executor;
pub mod recommendations;
pub mod types;

// Re-exports for convenience
pub use chat_session::ChatSession;
pub use errors::AgentError;
pub use executor::{ApplicationExecutor, SharedStore};
pub use recommendations::{RecommendationStore, DEFAULT_RECOMMENDATION_TTL};
pub use types::{ApplyResult, ApplyTarget, NO_RECOMMENDATIONS_FOUND};

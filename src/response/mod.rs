//! Response handling: turns a streamed model response into file actions.
//!
//! This module owns everything that reads model output:
//! - Path plausibility checks for strings that look like file targets
//! - Live interpretation of `<read_file>` / `<write_file>` / `<open_file>` tags
//!   while the response is still streaming
//! - Fenced code block scanning and target inference once the response is done
//!
//! Nothing in here touches the filesystem. Dispatching tool calls and writing
//! recommendations is the job of `agent_core`.

pub mod code_blocks;
pub mod errors;
pub mod extractor;
pub mod interpreter;
pub mod path_classifier;
pub mod tool_tags;
pub mod types;

// Re-exports for convenience
pub use errors::ResponseError;
pub use extractor::{extract_recommendations, ExtractorOptions, RecommendationExtractor};
pub use interpreter::{InterpreterEvent, ToolCallInterpreter};
pub use path_classifier::is_valid_path;
pub use tool_tags::{ToolCall, ToolKind};
pub use types::{LineRange, Recommendation, RequestId};

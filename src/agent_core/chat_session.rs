//! Chat session: the entry points the UI drives.
//!
//! One session owns the per-request interpreter state, the shared
//! recommendation store, and the executor. The flow for one turn:
//!
//! 1. `begin_request` posts the user message and mints a request id
//! 2. `handle_incoming_chunk` per streamed fragment: text goes to the UI live,
//!    tool calls are dispatched as soon as their closing tag arrives
//! 3. `finalize_response` extracts recommendations from the full text and
//!    stores them under the request id
//! 4. later, `apply_recommendation` / `reject_recommendations`
//!
//! `stream_response` runs steps 2 and 3 over a chunk stream.
//!
//! At most one response streams per session at a time; that is the caller's
//! precondition. Cancelling a response (directly or by clearing the chat)
//! discards its interpreter state and makes any later finalize for that id a
//! no-op.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};

use super::errors::AgentError;
use super::executor::{ApplicationExecutor, SharedStore};
use super::recommendations::{RecommendationStore, DEFAULT_RECOMMENDATION_TTL};
use super::types::{ApplyResult, ApplyTarget, NO_RECOMMENDATIONS_FOUND};
use crate::config::ChatEditConfig;
use crate::host::{FileIo, NotificationSink};
use crate::response::code_blocks::{extension_of, language_for_extension};
use crate::response::{
    ExtractorOptions, InterpreterEvent, Recommendation, RecommendationExtractor, RequestId,
    ResponseError, ToolCall, ToolCallInterpreter,
};
use crate::TokioMutex;

/// State for one response that is still streaming.
#[derive(Debug, Default)]
struct InFlightResponse {
    interpreter: ToolCallInterpreter,
    full_text: String,
}

pub struct ChatSession {
    file_io: Arc<dyn FileIo>,
    sink: Arc<dyn NotificationSink>,
    store: SharedStore,
    executor: ApplicationExecutor,
    extractor: RecommendationExtractor,
    in_flight: HashMap<RequestId, InFlightResponse>,
    /// Requests whose results must be ignored if they still arrive.
    cancelled: HashSet<RequestId>,
    /// Unix millis of the last chat clear. Requests minted earlier are stale.
    cleared_at_ms: Option<i64>,
    ttl: Duration,
}

impl ChatSession {
    pub fn new(file_io: Arc<dyn FileIo>, sink: Arc<dyn NotificationSink>) -> Self {
        let store: SharedStore = Arc::new(TokioMutex::new(RecommendationStore::new()));
        Self::with_store(file_io, sink, store)
    }

    /// Build a session around an existing store.
    pub fn with_store(
        file_io: Arc<dyn FileIo>,
        sink: Arc<dyn NotificationSink>,
        store: SharedStore,
    ) -> Self {
        let executor = ApplicationExecutor::new(file_io.clone(), store.clone());
        Self {
            file_io,
            sink,
            store,
            executor,
            extractor: RecommendationExtractor::default(),
            in_flight: HashMap::new(),
            cancelled: HashSet::new(),
            cleared_at_ms: None,
            ttl: DEFAULT_RECOMMENDATION_TTL,
        }
    }

    pub fn from_config(
        config: &ChatEditConfig,
        file_io: Arc<dyn FileIo>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::new(file_io, sink)
            .with_ttl(config.recommendation_ttl())
            .with_extractor_options(ExtractorOptions {
                max_comment_scan_lines: config.max_comment_scan_lines,
            })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_extractor_options(mut self, options: ExtractorOptions) -> Self {
        self.extractor = RecommendationExtractor::new(options);
        self
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    // ─── Streaming ──────────────────────────────────────────────────────────

    /// Post the user's message and open a new request.
    pub async fn begin_request(&mut self, user_text: &str) -> RequestId {
        self.sink.post_user(user_text);
        let request_id = RequestId::new();
        self.in_flight
            .insert(request_id.clone(), InFlightResponse::default());
        self.sweep_expired().await;
        self.forget_old_cancellations(&request_id);

        tracing::info!(request_id = %request_id, "request started");
        request_id
    }

    /// Feed one streamed fragment of the response for `request_id`.
    pub async fn handle_incoming_chunk(&mut self, request_id: &RequestId, chunk: &str) {
        if self.is_stale(request_id) {
            tracing::debug!(request_id = %request_id, "ignoring chunk for cancelled request");
            return;
        }

        let events = {
            let response = self.in_flight.entry(request_id.clone()).or_default();
            response.full_text.push_str(chunk);
            response.interpreter.push(chunk)
        };

        for event in events {
            match event {
                InterpreterEvent::Text(text) => self.sink.post_assistant(&text, true),
                InterpreterEvent::Call(call) => self.dispatch(request_id, &call).await,
            }
        }
    }

    /// Finish the response: extract recommendations from `full_text`, store
    /// them, and prompt the user. Returns nothing for a cancelled request.
    pub async fn finalize_response(
        &mut self,
        request_id: &RequestId,
        full_text: &str,
    ) -> Vec<Recommendation> {
        if let Some(mut response) = self.in_flight.remove(request_id) {
            if let Some(tail) = response.interpreter.finish() {
                self.sink.post_assistant(&tail, true);
            }
        }

        if self.is_stale(request_id) {
            self.cancelled.remove(request_id);
            tracing::info!(request_id = %request_id, "discarding result of cancelled request");
            return Vec::new();
        }

        self.sink.post_assistant(full_text, false);

        let recommendations = self.extractor.extract(full_text);
        if recommendations.is_empty() {
            tracing::debug!(request_id = %request_id, "no recommendations in response");
            return recommendations;
        }

        self.store
            .lock()
            .await
            .put(request_id, recommendations.clone());

        let summary = recommendation_summary(&recommendations);
        self.sink
            .post_recommendation_prompt(request_id, &recommendations, &summary);
        recommendations
    }

    /// Drive a whole response from a chunk stream.
    ///
    /// A transport error drops the request's state, posts an error, and
    /// stores nothing.
    pub async fn stream_response<S, E>(
        &mut self,
        request_id: &RequestId,
        stream: S,
    ) -> Result<Vec<Recommendation>, ResponseError>
    where
        S: Stream<Item = Result<String, E>>,
        E: Display,
    {
        futures::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => self.handle_incoming_chunk(request_id, &chunk).await,
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(request_id = %request_id, error = %reason, "response stream failed");
                    self.discard_in_flight(request_id);
                    self.sink.post_error(&format!("Response failed: {reason}"));
                    return Err(ResponseError::StreamError { reason });
                }
            }
            if self.is_stale(request_id) {
                break;
            }
        }

        let full_text = self.accumulated_text(request_id).unwrap_or_default();
        Ok(self.finalize_response(request_id, &full_text).await)
    }

    /// Text received so far for a response that is still streaming.
    pub fn accumulated_text(&self, request_id: &RequestId) -> Option<String> {
        self.in_flight
            .get(request_id)
            .map(|response| response.full_text.clone())
    }

    /// Stop a response early. Its interpreter state is dropped and any later
    /// finalize for it stores nothing.
    pub fn cancel_response(&mut self, request_id: &RequestId) {
        self.discard_in_flight(request_id);
        self.cancelled.insert(request_id.clone());
        tracing::info!(request_id = %request_id, "response cancelled");
    }

    fn discard_in_flight(&mut self, request_id: &RequestId) {
        if let Some(mut response) = self.in_flight.remove(request_id) {
            response.interpreter.reset();
        }
    }

    /// Cancelled ids whose finalize never came are kept for one TTL, then
    /// forgotten: anything they could still store would expire at once.
    fn forget_old_cancellations(&mut self, newest: &RequestId) {
        let max_age_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let now_ms = newest.timestamp_ms();
        let before = self.cancelled.len();
        self.cancelled
            .retain(|id| id.age_ms(now_ms) <= max_age_ms);
        let forgotten = before - self.cancelled.len();
        if forgotten > 0 {
            tracing::debug!(forgotten, "dropped old cancelled request ids");
        }
    }

    /// Clear the chat: cancel in-flight responses and drop every pending
    /// recommendation.
    pub async fn clear_chat(&mut self) {
        self.cancelled.clear();
        for (request_id, mut response) in self.in_flight.drain() {
            response.interpreter.reset();
            self.cancelled.insert(request_id);
        }
        self.cleared_at_ms = Some(chrono::Utc::now().timestamp_millis());
        self.store.lock().await.clear_all();
        tracing::info!(cancelled = self.cancelled.len(), "chat cleared");
    }

    fn is_stale(&self, request_id: &RequestId) -> bool {
        self.cancelled.contains(request_id)
            || self
                .cleared_at_ms
                .is_some_and(|cleared| request_id.timestamp_ms() < cleared)
    }

    // ─── Apply / Reject ─────────────────────────────────────────────────────

    /// Apply pending recommendations. `target` is a path or `"*"` for all.
    pub async fn apply_recommendation(
        &mut self,
        request_id: &RequestId,
        target: impl Into<ApplyTarget>,
    ) -> Vec<ApplyResult> {
        self.sweep_expired().await;
        let target = target.into();
        let results = self.executor.apply(request_id, &target).await;

        if results.iter().any(ApplyResult::is_not_found) {
            self.sink.post_error(NO_RECOMMENDATIONS_FOUND);
            return results;
        }

        self.sink.post_assistant(&apply_summary(&results), false);
        results
    }

    /// Discard pending recommendations without writing anything.
    pub async fn reject_recommendations(
        &mut self,
        request_id: &RequestId,
    ) -> Result<usize, AgentError> {
        self.sweep_expired().await;
        match self.executor.reject(request_id).await {
            Ok(count) => {
                self.sink.post_assistant(
                    &format!("Discarded {count} recommendation{}.", plural(count)),
                    false,
                );
                Ok(count)
            }
            Err(e) => {
                self.sink.post_error(NO_RECOMMENDATIONS_FOUND);
                Err(e)
            }
        }
    }

    /// Remove recommendations older than the session TTL.
    pub async fn sweep_expired(&self) -> usize {
        self.store
            .lock()
            .await
            .sweep(chrono::Utc::now(), self.ttl)
    }

    // ─── Tool Dispatch ──────────────────────────────────────────────────────

    async fn dispatch(&self, request_id: &RequestId, call: &ToolCall) {
        tracing::info!(
            request_id = %request_id,
            tool = call.kind().tag_name(),
            path = call.path(),
            "dispatching tool call"
        );

        match call {
            ToolCall::ReadFile { path } => match self.file_io.read(path).await {
                Ok(content) => {
                    let language = extension_of(path)
                        .and_then(|ext| language_for_extension(&ext))
                        .unwrap_or("");
                    self.sink.post_assistant(
                        &format!("Contents of {path}:\n```{language}\n{content}\n```"),
                        false,
                    );
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "read_file failed");
                    self.sink.post_error(&format!("Could not read {path}: {e}"));
                }
            },
            ToolCall::WriteFile { path, content } => {
                match self.file_io.write(path, content).await {
                    Ok(()) => self.sink.post_assistant(&format!("Wrote {path}"), false),
                    Err(e) => {
                        tracing::warn!(path, error = %e, "write_file failed");
                        self.sink.post_error(&format!("Could not write {path}: {e}"));
                    }
                }
            }
            ToolCall::OpenFile { path } => {
                if let Err(e) = self.file_io.open_in_editor(path).await {
                    tracing::warn!(path, error = %e, "open_file failed");
                }
            }
        }
    }
}

// ─── Summaries ──────────────────────────────────────────────────────────────

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// `"2 files recommended: main.go, config.yaml"`
fn recommendation_summary(recommendations: &[Recommendation]) -> String {
    let paths: Vec<&str> = recommendations
        .iter()
        .map(|r| r.file_path.as_str())
        .collect();
    format!(
        "{} file{} recommended: {}",
        paths.len(),
        plural(paths.len()),
        paths.join(", ")
    )
}

/// `"Applied 1 of 2 recommendations. Failed: b.rs (disk full)"`
fn apply_summary(results: &[ApplyResult]) -> String {
    let applied = results.iter().filter(|r| r.ok).count();
    let mut summary = format!(
        "Applied {applied} of {} recommendation{}.",
        results.len(),
        plural(results.len())
    );

    let failures: Vec<String> = results
        .iter()
        .filter(|r| !r.ok)
        .map(|r| match &r.error {
            Some(error) => format!("{} ({error})", r.file_path),
            None => r.file_path.clone(),
        })
        .collect();
    if !failures.is_empty() {
        summary.push_str(" Failed: ");
        summary.push_str(&failures.join(", "));
    }
    summary
}

// ─── Tests ──────────────────────────────────────────────────────────────────

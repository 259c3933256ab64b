//! Application Executor: writes pending recommendations on user request.
//!
//! Apply-all writes every pending file independently and evicts the request
//! whatever the outcome. Apply-one writes a single exact path; success
//! removes it from the store and asks the editor to refresh, failure leaves
//! it pending so the user can retry. A store miss never touches the disk.

use std::sync::Arc;

use super::errors::AgentError;
use super::recommendations::RecommendationStore;
use super::types::{ApplyResult, ApplyTarget};
use crate::host::FileIo;
use crate::response::{Recommendation, RequestId};
use crate::TokioMutex;

/// The store as shared between the chat session and the executor.
pub type SharedStore = Arc<TokioMutex<RecommendationStore>>;

pub struct ApplicationExecutor {
    file_io: Arc<dyn FileIo>,
    store: SharedStore,
}

impl ApplicationExecutor {
    pub fn new(file_io: Arc<dyn FileIo>, store: SharedStore) -> Self {
        Self { file_io, store }
    }

    /// Apply pending recommendations for `request_id`. One result per file
    /// attempted, or a single not-found result.
    pub async fn apply(&self, request_id: &RequestId, target: &ApplyTarget) -> Vec<ApplyResult> {
        match target {
            ApplyTarget::All => self.apply_all(request_id).await,
            ApplyTarget::File(path) => vec![self.apply_one(request_id, path).await],
        }
    }

    async fn apply_all(&self, request_id: &RequestId) -> Vec<ApplyResult> {
        let pending: Vec<Recommendation> = {
            let store = self.store.lock().await;
            match store.get(request_id) {
                Ok(recs) => recs.to_vec(),
                Err(e) => {
                    tracing::info!(request_id = %request_id, error = %e, "apply-all on unknown request");
                    return vec![ApplyResult::not_found("*")];
                }
            }
        };

        let mut results = Vec::with_capacity(pending.len());
        for rec in &pending {
            results.push(self.write_one(request_id, rec).await);
        }

        self.store.lock().await.clear(request_id);

        let applied = results.iter().filter(|r| r.ok).count();
        tracing::info!(
            request_id = %request_id,
            applied,
            failed = results.len() - applied,
            "apply-all finished"
        );
        results
    }

    async fn apply_one(&self, request_id: &RequestId, path: &str) -> ApplyResult {
        let rec = {
            let store = self.store.lock().await;
            match store.find(request_id, path) {
                Ok(rec) => rec.clone(),
                Err(e) => {
                    tracing::info!(request_id = %request_id, path, error = %e, "apply on unknown recommendation");
                    return ApplyResult::not_found(path);
                }
            }
        };

        let result = self.write_one(request_id, &rec).await;
        if !result.ok {
            return result;
        }

        self.store.lock().await.remove_one(request_id, path);

        if let Err(e) = self.file_io.open_in_editor(&rec.file_path).await {
            tracing::debug!(path, error = %e, "editor refresh skipped");
        }
        result
    }

    async fn write_one(&self, request_id: &RequestId, rec: &Recommendation) -> ApplyResult {
        match self.file_io.write(&rec.file_path, &rec.code).await {
            Ok(()) => ApplyResult::success(&rec.file_path),
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    path = %rec.file_path,
                    error = %e,
                    "failed to apply recommendation"
                );
                ApplyResult::failure(&rec.file_path, e.to_string())
            }
        }
    }

    /// Discard all pending recommendations for `request_id` without touching
    /// any file. Returns how many were discarded.
    pub async fn reject(&self, request_id: &RequestId) -> Result<usize, AgentError> {
        let removed = self.store.lock().await.clear(request_id);
        if removed == 0 {
            return Err(AgentError::RecommendationsNotFound {
                request_id: request_id.to_string(),
            });
        }
        tracing::info!(request_id = %request_id, removed, "recommendations rejected");
        Ok(removed)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

//! Trace ingestion pipeline
//!
//! One pipeline shared by the HTTP/JSON, HTTP/Protobuf, and gRPC entry
//! points: authorise → rate-limit → flatten/normalise → in-batch roll-up →
//! record usage → bulk insert → deferred roll-up for external parents.

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use thiserror::Error;

use super::normalize::normalize_request;
use super::rollup::{DeferredRollup, apply_delta, rollup_batch};
use crate::core::constants::SPAN_UPDATE_MAX_RETRIES;
use crate::data::cache::RateLimiter;
use crate::data::search::{SearchError, SearchService};
use crate::data::types::{ApiKeyRole, Organization};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("API key role does not permit ingestion")]
    Forbidden,

    #[error("Span ingestion quota exceeded")]
    RateLimited {
        /// Epoch ms when the window frees a slot
        reset_at: i64,
    },

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    #[error("Ingestion failed: {0}")]
    Internal(String),
}

impl From<SearchError> for IngestError {
    fn from(e: SearchError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

pub struct IngestPipeline {
    search: Arc<SearchService>,
    rate_limiter: Arc<RateLimiter>,
}

impl IngestPipeline {
    pub fn new(search: Arc<SearchService>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            search,
            rate_limiter,
        }
    }

    /// Ingest one export request for an authenticated tenant.
    /// Returns the number of spans persisted.
    pub async fn ingest(
        &self,
        org: &Organization,
        role: ApiKeyRole,
        request: &ExportTraceServiceRequest,
    ) -> Result<usize, IngestError> {
        // Authorise: every key role may ingest, but the check stays explicit
        // so a future read-only role fails here
        if !role.can_ingest() {
            return Err(IngestError::Forbidden);
        }

        // Rate-limit before any persistence. A `None` decision means the
        // limiter store is down: fail open.
        let limit = org.effective_rate_limit();
        if let Some(decision) = self.rate_limiter.check(&org.id, limit).await
            && !decision.allowed
        {
            tracing::debug!(org = %org.id, limit, "Span ingestion rate limited");
            return Err(IngestError::RateLimited {
                reset_at: decision.reset_at,
            });
        }

        // Flatten + normalise, then roll children into in-batch parents
        let mut spans = normalize_request(request, &org.id);
        if spans.is_empty() {
            return Ok(0);
        }
        let deferred = rollup_batch(&mut spans);

        // Record usage before insert; a cancellation between here and the
        // insert leaves the counter slightly ahead, consistent with the
        // fail-open stance
        self.rate_limiter.record(&org.id, spans.len()).await;

        let count = spans.len();
        self.search.bulk_insert_spans(&spans).await?;

        // Late-arriving children update parents already in the store
        if !deferred.is_empty() {
            self.apply_deferred_rollups(&org.id, deferred).await;
        }

        tracing::debug!(org = %org.id, spans = count, "Ingested spans");
        Ok(count)
    }

    /// Apply `_seen`-guarded deltas to parents outside the batch.
    /// Conflicts with concurrent writers retry a bounded number of times;
    /// missing parents are skipped (they may never have carried counters).
    async fn apply_deferred_rollups(&self, org_id: &str, deferred: Vec<DeferredRollup>) {
        for rollup in deferred {
            let mut attempts = 0;
            loop {
                attempts += 1;

                let guarded = match self.search.get_span_for_update(&rollup.parent_id, org_id).await
                {
                    Ok(Some(g)) => g,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(
                            parent = %rollup.parent_id,
                            error = %e,
                            "Deferred roll-up read failed"
                        );
                        break;
                    }
                };

                let mut guarded = guarded;
                if !apply_delta(&mut guarded.span, rollup.child_hash.clone(), &rollup.delta) {
                    break; // already accumulated
                }

                match self.search.update_span_guarded(&guarded).await {
                    Ok(()) => break,
                    Err(SearchError::Conflict(_)) if attempts < SPAN_UPDATE_MAX_RETRIES => {
                        tracing::trace!(
                            parent = %rollup.parent_id,
                            attempts,
                            "Deferred roll-up conflict, retrying"
                        );
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            parent = %rollup.parent_id,
                            error = %e,
                            "Deferred roll-up write failed"
                        );
                        break;
                    }
                }
            }
        }
    }
}

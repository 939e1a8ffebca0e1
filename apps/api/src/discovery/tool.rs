//! The job-search tool: quota → gate → provider → extraction/dedup → date check.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::dedup::DedupFilters;
use crate::discovery::existing_jobs::{ExistingJobsCache, JobsSource};
use crate::discovery::extract::extract_with_reason;
use crate::discovery::fetcher::PageFetcher;
use crate::discovery::format::{
    format_empty, format_limit_reached, format_listings, format_provider_error, CANCELLED_TEXT,
};
use crate::discovery::freshness::PostingDateVerifier;
use crate::discovery::query::build_query;
use crate::discovery::quota::{
    Admission, SearchGate, TurnQuota, TurnStats, DEFAULT_MAX_CONCURRENT_SEARCHES,
    DEFAULT_MAX_SEARCHES_PER_TURN,
};
use crate::discovery::seen::SessionSeenStore;
use crate::models::listing::{JobListing, SearchOutcome, SearchRequest, ToolOutput};
use crate::search_client::SearchProvider;

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub max_searches_per_turn: usize,
    pub max_concurrent_searches: usize,
    pub verify_posting_dates: bool,
    /// Lenient window applied when the request has no time filter.
    pub default_max_age_days: i64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            max_searches_per_turn: DEFAULT_MAX_SEARCHES_PER_TURN,
            max_concurrent_searches: DEFAULT_MAX_CONCURRENT_SEARCHES,
            verify_posting_dates: true,
            default_max_age_days: 30,
        }
    }
}

pub struct JobSearchTool {
    provider: Arc<dyn SearchProvider>,
    existing: ExistingJobsCache,
    seen: SessionSeenStore,
    quota: TurnQuota,
    gate: SearchGate,
    verifier: PostingDateVerifier,
    settings: ToolSettings,
}

impl JobSearchTool {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        jobs: Arc<dyn JobsSource>,
        fetcher: Arc<dyn PageFetcher>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            provider,
            existing: ExistingJobsCache::new(jobs),
            seen: SessionSeenStore::new(),
            quota: TurnQuota::new(settings.max_searches_per_turn),
            gate: SearchGate::new(settings.max_concurrent_searches),
            verifier: PostingDateVerifier::new(fetcher),
            settings,
        }
    }

    /// Turn lifecycle hook. Called by the orchestrator once per conversation turn.
    pub fn reset_for_new_turn(&self) {
        self.quota.reset();
        info!("Turn quota reset");
    }

    pub fn turn_stats(&self) -> TurnStats {
        self.quota.stats()
    }

    /// Drops the cached CRM snapshot so the next search reloads it.
    pub fn invalidate_existing_jobs(&self) {
        self.existing.invalidate();
        info!("Existing-jobs cache invalidated");
    }

    /// (max age, strict). Explicit windows are strict; the default window is not.
    fn age_policy(&self, req: &SearchRequest) -> (chrono::Duration, bool) {
        match req.time_filter.window_days() {
            Some(days) => (chrono::Duration::days(days), true),
            None => (chrono::Duration::days(self.settings.default_max_age_days), false),
        }
    }

    /// Runs one search. Never fails: provider errors, quota exhaustion, and
    /// cancellation all come back as a message with `count == 0`.
    pub async fn run(
        &self,
        session_id: &str,
        req: &SearchRequest,
        cancel: &CancellationToken,
    ) -> ToolOutput {
        let max = self.quota.max_per_turn();

        if cancel.is_cancelled() {
            return ToolOutput::message(SearchOutcome::Cancelled, CANCELLED_TEXT);
        }

        let position = match self.quota.admit(&req.query) {
            Admission::Accepted { position } => position,
            Admission::Rejected { total_results } => {
                info!(session_id, query = %req.query, "Job search rejected: turn limit reached");
                return ToolOutput::message(
                    SearchOutcome::LimitReached,
                    format_limit_reached(max, total_results),
                );
            }
        };

        let Some(_permit) = self.gate.acquire(cancel).await else {
            info!(session_id, position, "Job search cancelled while waiting for a slot");
            return ToolOutput::message(SearchOutcome::Cancelled, CANCELLED_TEXT);
        };

        let provider_query = build_query(req);
        info!(
            session_id,
            position,
            max,
            ats_mode = req.ats_mode,
            query = %req.query,
            "Running job search"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return ToolOutput::message(SearchOutcome::Cancelled, CANCELLED_TEXT);
            }
            res = self.provider.search(&provider_query) => res,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(session_id, error = %e, "Search provider call failed");
                return ToolOutput::message(SearchOutcome::ProviderError, format_provider_error(&e));
            }
        };

        let existing = self.existing.get_existing().await;
        let seen = self.seen.seen(session_id);
        let filters = DedupFilters::new(&existing, &seen);
        let now = Utc::now();

        let mut batch_urls = HashSet::new();
        let mut listings: Vec<JobListing> = Vec::new();
        let mut skipped = 0usize;
        for raw in &response.organic_results {
            if !batch_urls.insert(raw.link.trim()) {
                continue;
            }
            match extract_with_reason(raw, &filters, now) {
                Ok(listing) => listings.push(listing),
                Err(reason) => {
                    debug!(url = %raw.link, ?reason, "Result dropped");
                    skipped += 1;
                }
            }
        }

        let verified = self.settings.verify_posting_dates && !listings.is_empty();
        let mut listings = if verified {
            let (max_age, strict) = self.age_policy(req);
            self.verifier.verify(listings, max_age, strict, cancel).await
        } else {
            listings
        };

        if cancel.is_cancelled() {
            info!(session_id, position, "Job search cancelled during verification");
            return ToolOutput::message(SearchOutcome::Cancelled, CANCELLED_TEXT);
        }

        // A concurrent call in the same session may have claimed some URLs
        // since the snapshot was taken.
        let claimed = self
            .seen
            .mark_seen(session_id, listings.iter().map(|l| l.url.clone()));
        let before = listings.len();
        listings.retain(|l| claimed.contains(&l.url));
        skipped += before - listings.len();
        self.quota.record_results(listings.len());

        info!(
            session_id,
            position,
            raw = response.organic_results.len(),
            skipped,
            returned = listings.len(),
            "Job search complete"
        );

        let display_text = if listings.is_empty() {
            format_empty(position, max, skipped)
        } else {
            format_listings(&listings, position, max, verified, Utc::now())
        };

        ToolOutput {
            display_text,
            count: listings.len(),
            related_queries: response.related_queries,
            listings,
            outcome: SearchOutcome::Completed,
        }
    }
}

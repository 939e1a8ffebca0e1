//! Posting-Date Verifier — prunes listings older than the requested window.
//!
//! Listings without a provider date get their page fetched (bounded fan-out,
//! per-request timeout) and scanned for a posting date. Undated listings are
//! dropped in strict mode, otherwise appended after every dated listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::discovery::dates::extract_posted_date;
use crate::discovery::fetcher::{PageFetcher, PAGE_FETCH_TIMEOUT};
use crate::models::listing::JobListing;

pub const PAGE_FETCH_CONCURRENCY: usize = 5;

pub struct PostingDateVerifier {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
    timeout: Duration,
}

impl PostingDateVerifier {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            concurrency: PAGE_FETCH_CONCURRENCY,
            timeout: PAGE_FETCH_TIMEOUT,
        }
    }

    pub async fn verify(
        &self,
        listings: Vec<JobListing>,
        max_age: chrono::Duration,
        strict: bool,
        cancel: &CancellationToken,
    ) -> Vec<JobListing> {
        self.verify_at(listings, max_age, strict, cancel, Utc::now())
            .await
    }

    pub async fn verify_at(
        &self,
        mut listings: Vec<JobListing>,
        max_age: chrono::Duration,
        strict: bool,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Vec<JobListing> {
        let unknown: Vec<(usize, String)> = listings
            .iter()
            .enumerate()
            .filter(|(_, l)| l.posted.is_none())
            .map(|(i, l)| (i, l.url.clone()))
            .collect();

        for (idx, posted) in self.fetch_dates(unknown, cancel, now).await {
            listings[idx].posted = posted;
        }

        let cutoff = now - max_age;
        let mut dated = Vec::with_capacity(listings.len());
        let mut undated = Vec::new();
        let mut stale = 0usize;

        for listing in listings {
            match listing.posted {
                Some(posted) if posted >= cutoff => dated.push(listing),
                Some(_) => stale += 1,
                None if strict => {}
                None => undated.push(listing),
            }
        }

        debug!(
            fresh = dated.len(),
            stale,
            undated = undated.len(),
            strict,
            "Posting dates verified"
        );

        dated.extend(undated);
        dated
    }

    /// Fetches each page with at most `concurrency` requests in flight and waits
    /// for every one. Errors, timeouts, and cancellation all yield `None`.
    async fn fetch_dates(
        &self,
        targets: Vec<(usize, String)>,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Vec<(usize, Option<DateTime<Utc>>)> {
        if targets.is_empty() {
            return Vec::new();
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (idx, url) in targets {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let fetcher = self.fetcher.clone();
            let cancel = cancel.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let _permit = permit;
                let fetched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    res = tokio::time::timeout(timeout, fetcher.fetch(&url)) => match res {
                        Ok(Ok(markup)) => Some(markup),
                        Ok(Err(e)) => {
                            debug!(url = %url, error = %e, "Page fetch failed");
                            None
                        }
                        Err(_) => {
                            debug!(url = %url, "Page fetch timed out");
                            None
                        }
                    },
                };
                (idx, fetched.and_then(|markup| extract_posted_date(&markup, now)))
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "Page fetch task failed"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::fetcher::FetchError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn listing(url: &str, days_old: Option<i64>) -> JobListing {
        JobListing {
            company: "Acme".to_string(),
            title: "Engineer".to_string(),
            url: url.to_string(),
            posted: days_old.map(|d| now() - chrono::Duration::days(d)),
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        pages: HashMap<String, String>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_pages(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, p)| (u.to_string(), p.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }

    fn verifier(fetcher: Arc<FakeFetcher>) -> PostingDateVerifier {
        PostingDateVerifier::new(fetcher)
    }

    fn week() -> chrono::Duration {
        chrono::Duration::days(7)
    }

    #[tokio::test]
    async fn test_known_dates_filtered_by_age() {
        let fetcher = Arc::new(FakeFetcher::default());
        let out = verifier(fetcher.clone())
            .verify_at(
                vec![listing("https://a.com/old", Some(10)), listing("https://a.com/new", Some(3))],
                week(),
                true,
                &CancellationToken::new(),
                now(),
            )
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a.com/new");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undated_strict_dropped() {
        let fetcher = Arc::new(FakeFetcher::default());
        let out = verifier(fetcher)
            .verify_at(
                vec![listing("https://a.com/unknown", None), listing("https://a.com/new", Some(3))],
                week(),
                true,
                &CancellationToken::new(),
                now(),
            )
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a.com/new");
    }

    #[tokio::test]
    async fn test_undated_lenient_appended_last() {
        let fetcher = Arc::new(FakeFetcher::default());
        let out = verifier(fetcher)
            .verify_at(
                vec![
                    listing("https://a.com/unknown", None),
                    listing("https://a.com/new", Some(3)),
                    listing("https://a.com/newer", Some(1)),
                ],
                week(),
                false,
                &CancellationToken::new(),
                now(),
            )
            .await;
        let urls: Vec<_> = out.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.com/new", "https://a.com/newer", "https://a.com/unknown"]
        );
        assert_eq!(out[2].posted, None);
    }

    #[tokio::test]
    async fn test_fetched_page_dates_applied() {
        let fetcher = Arc::new(FakeFetcher::with_pages(&[
            ("https://a.com/fresh", "<p>Posted 2 days ago</p>"),
            ("https://a.com/stale", r#"{"datePosted": "2024-01-01"}"#),
        ]));
        let out = verifier(fetcher)
            .verify_at(
                vec![listing("https://a.com/stale", None), listing("https://a.com/fresh", None)],
                week(),
                true,
                &CancellationToken::new(),
                now(),
            )
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a.com/fresh");
        assert_eq!(out[0].posted, Some(now() - chrono::Duration::days(2)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unknown() {
        let fetcher = Arc::new(FakeFetcher::default());
        let out = verifier(fetcher.clone())
            .verify_at(
                vec![listing("https://a.com/missing", None)],
                week(),
                false,
                &CancellationToken::new(),
                now(),
            )
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].posted, None);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_bounded() {
        let pages: Vec<(String, String)> = (0..12)
            .map(|i| (format!("https://a.com/{i}"), "posted today".to_string()))
            .collect();
        let fetcher = Arc::new(FakeFetcher {
            pages: pages.iter().cloned().collect(),
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let listings = pages.iter().map(|(u, _)| listing(u, None)).collect();

        let out = verifier(fetcher.clone())
            .verify_at(listings, week(), true, &CancellationToken::new(), now())
            .await;

        assert_eq!(out.len(), 12);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 12);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), PAGE_FETCH_CONCURRENCY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_page_times_out_as_unknown() {
        let fetcher = Arc::new(FakeFetcher {
            pages: [("https://a.com/slow".to_string(), "posted today".to_string())]
                .into_iter()
                .collect(),
            delay: Duration::from_secs(30),
            ..Default::default()
        });
        let out = verifier(fetcher)
            .verify_at(
                vec![listing("https://a.com/slow", None)],
                week(),
                true,
                &CancellationToken::new(),
                now(),
            )
            .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_batch_treats_pages_as_unknown() {
        let fetcher = Arc::new(FakeFetcher::with_pages(&[("https://a.com/x", "posted today")]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = verifier(fetcher)
            .verify_at(vec![listing("https://a.com/x", None)], week(), false, &cancel, now())
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].posted, None);
    }
}

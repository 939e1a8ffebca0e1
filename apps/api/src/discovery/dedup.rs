use std::collections::HashSet;

use serde::Serialize;

use crate::discovery::normalize::{normalize_company, normalize_title};
use crate::discovery::query::EXCLUDED_SITES;
use crate::models::listing::ExistingJobRecord;

/// Aggregators that show up even when the query excludes job boards
/// (ATS mode drops the exclusion list entirely).
const EXTRA_AGGREGATORS: &[&str] = &[
    "careerjet.com",
    "jobleads.com",
    "jobright.ai",
    "neuvoo.com",
    "recruit.net",
    "jobsora.com",
];

/// Shortest normalized company name allowed to match by containment.
const MIN_CONTAINMENT_LEN: usize = 4;

/// Why a raw result was dropped before becoming a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    SessionDuplicate,
    Aggregator,
    InvalidUrl,
    ExistingRecord,
}

/// Host of `url`, lowercased, without a leading `www.`.
pub fn url_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|rest| rest.ends_with('.'))
}

pub fn is_aggregator_host(host: &str) -> bool {
    EXCLUDED_SITES
        .iter()
        .chain(EXTRA_AGGREGATORS)
        .any(|d| domain_matches(host, d))
}

pub fn is_session_duplicate(url: &str, seen: &HashSet<String>) -> bool {
    seen.contains(url)
}

fn fuzzy_eq(a: &str, b: &str, min_len: usize) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    a.len() >= min_len && b.len() >= min_len && (a.contains(b) || b.contains(a))
}

/// True when (company, title) refers to a job already tracked in the CRM.
/// Both sides must match: company by equality or containment (>= 4 chars),
/// title by equality or containment.
pub fn matches_existing(company: &str, title: &str, existing: &[ExistingJobRecord]) -> bool {
    let company = normalize_company(company);
    let title = normalize_title(title);
    existing.iter().any(|record| {
        fuzzy_eq(&company, &normalize_company(&record.account), MIN_CONTAINMENT_LEN)
            && fuzzy_eq(&title, &normalize_title(&record.job_title), 1)
    })
}

/// The three dedup predicates applied in one pass over candidates.
pub struct DedupFilters<'a> {
    pub existing: &'a [ExistingJobRecord],
    pub seen: &'a HashSet<String>,
}

impl<'a> DedupFilters<'a> {
    pub fn new(existing: &'a [ExistingJobRecord], seen: &'a HashSet<String>) -> Self {
        Self { existing, seen }
    }

    /// URL-level checks: session duplicate first, then aggregator domain.
    pub fn check_url(&self, url: &str) -> Result<String, DropReason> {
        if is_session_duplicate(url, self.seen) {
            return Err(DropReason::SessionDuplicate);
        }
        let host = url_host(url).ok_or(DropReason::InvalidUrl)?;
        if is_aggregator_host(&host) {
            return Err(DropReason::Aggregator);
        }
        Ok(host)
    }

    pub fn check_record(&self, company: &str, title: &str) -> Result<(), DropReason> {
        if matches_existing(company, title, self.existing) {
            Err(DropReason::ExistingRecord)
        } else {
            Ok(())
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recency window requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    #[default]
    None,
    Day,
    Week,
    Month,
}

impl TimeFilter {
    /// Age window in days for an explicit filter. `None` has no window of its own.
    pub fn window_days(self) -> Option<i64> {
        match self {
            TimeFilter::None => None,
            TimeFilter::Day => Some(1),
            TimeFilter::Week => Some(7),
            TimeFilter::Month => Some(30),
        }
    }
}

/// A single job-search tool invocation. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub ats_mode: bool,
    #[serde(default)]
    pub time_filter: TimeFilter,
    #[serde(default)]
    pub location: String,
}

/// One organic result as returned by the search provider.
/// `date` is free-form provider text ("Feb 12, 2017", "3 days ago") or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub date: String,
}

/// A candidate posting that survived extraction. `posted == None` means unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub company: String,
    pub title: String,
    pub url: String,
    pub posted: Option<DateTime<Utc>>,
}

/// Read-only projection of a CRM job, used only for dedup matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExistingJobRecord {
    pub job_title: String,
    pub account: String,
}

impl ExistingJobRecord {
    pub fn new(job_title: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            account: account.into(),
        }
    }
}

/// How a tool invocation ended. Only `Completed` carries listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Completed,
    LimitReached,
    Cancelled,
    ProviderError,
}

/// What the orchestrator gets back from the job-search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub display_text: String,
    pub count: usize,
    pub related_queries: Vec<String>,
    pub listings: Vec<JobListing>,
    pub outcome: SearchOutcome,
}

impl ToolOutput {
    /// A soft failure: message for the caller, no listings.
    pub fn message(outcome: SearchOutcome, display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            count: 0,
            related_queries: Vec::new(),
            listings: Vec::new(),
            outcome,
        }
    }
}

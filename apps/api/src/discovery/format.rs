//! Display text handed back to the orchestrator.

use chrono::{DateTime, Utc};

use crate::discovery::dates::describe_age;
use crate::models::listing::JobListing;
use crate::search_client::SearchError;

pub fn listing_line(listing: &JobListing, dates_verified: bool, now: DateTime<Utc>) -> String {
    let base = format!(
        "- {} - {} - [{}]({})",
        listing.company, listing.title, listing.url, listing.url
    );
    match listing.posted {
        Some(posted) => format!("{base} ({})", describe_age(posted, now)),
        None if dates_verified => format!("{base} (date unknown)"),
        None => base,
    }
}

pub fn format_listings(
    listings: &[JobListing],
    position: usize,
    max_per_turn: usize,
    dates_verified: bool,
    now: DateTime<Utc>,
) -> String {
    let mut out = format!(
        "Found {} new job listing{} (search {position} of {max_per_turn} this turn):",
        listings.len(),
        if listings.len() == 1 { "" } else { "s" }
    );
    for listing in listings {
        out.push('\n');
        out.push_str(&listing_line(listing, dates_verified, now));
    }
    out
}

pub fn format_empty(position: usize, max_per_turn: usize, skipped: usize) -> String {
    let mut out = format!("No new job listings found (search {position} of {max_per_turn} this turn).");
    if skipped > 0 {
        out.push_str(&format!(
            " {skipped} result{} skipped as already tracked, already shown, or from job aggregators.",
            if skipped == 1 { " was" } else { "s were" }
        ));
    }
    out.push_str(" Try broadening the query or removing the time filter.");
    out
}

pub fn format_limit_reached(max_per_turn: usize, total_results: usize) -> String {
    format!(
        "Search limit reached: {max_per_turn} job searches already ran this turn \
         ({total_results} listings returned so far). Use those results instead of searching again."
    )
}

pub const CANCELLED_TEXT: &str = "Job search cancelled.";

pub fn format_provider_error(err: &SearchError) -> String {
    format!(
        "Job search failed: {}. Try again later or rephrase the query.",
        err.summary()
    )
}

// Job-listing discovery engine.
// Query building, result extraction, dedup against session/aggregators/CRM,
// posting-date verification, and per-turn quota. Provider calls go through
// search_client only.

pub mod dates;
pub mod dedup;
pub mod existing_jobs;
pub mod extract;
pub mod fetcher;
pub mod format;
pub mod freshness;
pub mod handlers;
pub mod normalize;
pub mod query;
pub mod quota;
pub mod seen;
pub mod tool;

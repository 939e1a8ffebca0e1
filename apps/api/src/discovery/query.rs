//! Query Builder — turns a `SearchRequest` into a provider query.

use crate::models::listing::{SearchRequest, TimeFilter};

/// Applicant-tracking platforms searched directly in ATS mode.
pub const ATS_SITES: &[&str] = &[
    "boards.greenhouse.io",
    "jobs.lever.co",
    "jobs.ashbyhq.com",
    "apply.workable.com",
];

/// Job boards, remote boards, and aggregators excluded from regular searches.
pub const EXCLUDED_SITES: &[&str] = &[
    // major boards
    "linkedin.com",
    "indeed.com",
    "glassdoor.com",
    "ziprecruiter.com",
    "monster.com",
    "simplyhired.com",
    "careerbuilder.com",
    // tech boards
    "dice.com",
    "builtin.com",
    "wellfound.com",
    "angel.co",
    "levels.fyi",
    "hired.com",
    "otta.com",
    // remote boards
    "weworkremotely.com",
    "remoteok.com",
    "remotive.com",
    "flexjobs.com",
    "himalayas.app",
    "workingnomads.com",
    // aggregators
    "jooble.org",
    "talent.com",
    "adzuna.com",
    "lensa.com",
    "jobgether.com",
    "learn4good.com",
];

const CAREERS_BIAS: &str = "careers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQuery {
    pub query: String,
    pub time_range_code: Option<String>,
    pub location: Option<String>,
}

/// Builds the provider query. Deterministic and infallible.
pub fn build_query(req: &SearchRequest) -> ProviderQuery {
    let base = req.query.trim();

    let query = if req.ats_mode {
        let sites = ATS_SITES
            .iter()
            .map(|s| format!("site:{s}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("{base} ({sites})")
    } else {
        let exclusions = EXCLUDED_SITES
            .iter()
            .map(|s| format!("-site:{s}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{base} {CAREERS_BIAS} {exclusions}")
    };

    let location = req.location.trim();

    ProviderQuery {
        query,
        time_range_code: time_range_code(req.time_filter).map(str::to_string),
        location: (!location.is_empty()).then(|| location.to_string()),
    }
}

/// Google-style `tbs` recency code.
fn time_range_code(filter: TimeFilter) -> Option<&'static str> {
    match filter {
        TimeFilter::None => None,
        TimeFilter::Day => Some("qdr:d"),
        TimeFilter::Week => Some("qdr:w"),
        TimeFilter::Month => Some("qdr:m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_regular_query_excludes_boards() {
        let q = build_query(&req("rust engineer"));
        assert!(q.query.starts_with("rust engineer careers "));
        assert!(q.query.contains("-site:linkedin.com"));
        assert!(q.query.contains("-site:jooble.org"));
        assert!(!q.query.contains("site:jobs.lever.co"));
    }

    #[test]
    fn test_exclusion_list_size() {
        assert!(EXCLUDED_SITES.len() >= 25);
    }

    #[test]
    fn test_ats_query_biases_platforms() {
        let q = build_query(&SearchRequest {
            ats_mode: true,
            ..req("data engineer")
        });
        assert_eq!(
            q.query,
            "data engineer (site:boards.greenhouse.io OR site:jobs.lever.co OR site:jobs.ashbyhq.com OR site:apply.workable.com)"
        );
        assert!(!q.query.contains("-site:"));
        assert!(!q.query.contains(CAREERS_BIAS));
    }

    #[test]
    fn test_time_filter_codes() {
        let code = |tf| {
            build_query(&SearchRequest {
                time_filter: tf,
                ..req("x")
            })
            .time_range_code
        };
        assert_eq!(code(TimeFilter::None), None);
        assert_eq!(code(TimeFilter::Day).as_deref(), Some("qdr:d"));
        assert_eq!(code(TimeFilter::Week).as_deref(), Some("qdr:w"));
        assert_eq!(code(TimeFilter::Month).as_deref(), Some("qdr:m"));
    }

    #[test]
    fn test_blank_location_omitted() {
        assert_eq!(build_query(&req("x")).location, None);
        let q = build_query(&SearchRequest {
            location: " Berlin ".to_string(),
            ..req("x")
        });
        assert_eq!(q.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(build_query(&req("sre")), build_query(&req("sre")));
    }
}

//! Result Extractor — turns a raw provider result into a `JobListing`.
//!
//! Company/title come from an ordered list of delimiter strategies applied to the
//! result title. A split is accepted only when the company side does not itself read
//! like a job title or a careers-page label. When every strategy fails the company is
//! derived from the URL and the full original title is kept as the title, so a result
//! such as "Netflix - Senior SWE" stays whole.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::discovery::dates::parse_provider_date;
use crate::discovery::dedup::{DedupFilters, DropReason};
use crate::models::listing::{ExistingJobRecord, JobListing, RawResult};

/// Words that mark text as a role or a generic careers label rather than a company.
const ROLE_OR_LABEL_WORDS: &[&str] = &[
    "engineer", "engineering", "developer", "manager", "designer", "analyst", "scientist",
    "director", "intern", "internship", "architect", "consultant", "specialist", "coordinator",
    "administrator", "recruiter", "swe", "sre", "senior", "junior", "staff", "principal", "lead",
    "head", "careers", "career", "jobs", "job", "hiring", "openings", "opening", "positions",
    "apply", "application", "remote", "vacancies",
];

/// Title prefixes some ATS pages put in front of the role.
const TITLE_NOISE_PREFIXES: &[&str] = &["job application for "];

/// Platforms whose first path segment is the organization slug.
const PATH_SLUG_ATS: &[&str] = &[
    "boards.greenhouse.io",
    "job-boards.greenhouse.io",
    "jobs.lever.co",
    "jobs.ashbyhq.com",
    "apply.workable.com",
    "jobs.smartrecruiters.com",
];

/// Platforms whose subdomain is the organization slug.
const SUBDOMAIN_ATS: &[&str] = &["bamboohr.com", "recruitee.com", "breezy.hr", "teamtailor.com"];

/// Host labels that never name the company.
const GENERIC_HOST_LABELS: &[&str] = &["careers", "jobs", "job", "apply", "boards", "work", "hire"];

const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "org", "net", "ac", "gov"];

/// Delimiters in priority order. The plain hyphen is the most ambiguous and goes last.
const ALL_DELIMITERS: &[&str] = &[" | ", " — ", " – ", " - "];

/// Trailing qualifiers such as "(Remote)" or "[Hybrid]" after a company name.
const QUALIFIER_OPENERS: &[&str] = &[" (", " ["];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSplit {
    pub company: String,
    pub title: String,
}

type TitleStrategy = fn(&str) -> Option<TitleSplit>;

/// Tried in order; the first valid split wins.
const TITLE_STRATEGIES: &[TitleStrategy] = &[
    split_at_word,
    split_at_sign,
    split_pipe,
    split_em_dash,
    split_hyphen,
];

fn split_at_word(raw: &str) -> Option<TitleSplit> {
    split_company_after(raw, " at ", true)
}

fn split_at_sign(raw: &str) -> Option<TitleSplit> {
    split_company_after(raw, " @ ", true)
}

fn split_pipe(raw: &str) -> Option<TitleSplit> {
    split_company_after(raw, " | ", false)
}

fn split_em_dash(raw: &str) -> Option<TitleSplit> {
    split_company_after(raw, " — ", false).or_else(|| split_company_after(raw, " – ", false))
}

fn split_hyphen(raw: &str) -> Option<TitleSplit> {
    split_company_after(raw, " - ", false)
}

/// "<title><delim><company>[<other delim>...]". `last` picks the final occurrence,
/// so "Head of Work at Home at Acme" yields "Acme".
fn split_company_after(raw: &str, delim: &str, last: bool) -> Option<TitleSplit> {
    let idx = if last {
        raw.rfind(delim)?
    } else {
        raw.find(delim)?
    };
    let title = raw[..idx].trim();
    let company = cut_at_delimiter(raw[idx + delim.len()..].trim());

    if title.is_empty() || company.is_empty() || looks_like_role_or_label(company) {
        return None;
    }
    Some(TitleSplit {
        company: company.to_string(),
        title: title.to_string(),
    })
}

fn cut_at_delimiter(text: &str) -> &str {
    ALL_DELIMITERS
        .iter()
        .chain(QUALIFIER_OPENERS)
        .filter_map(|d| text.find(d))
        .min()
        .map(|i| text[..i].trim())
        .unwrap_or(text)
        .trim_end_matches(|c: char| c == '.' || c == ',')
}

/// Heuristic, not a guarantee: any role/label word makes the text a non-company.
pub fn looks_like_role_or_label(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ROLE_OR_LABEL_WORDS.contains(&word))
}

fn strip_title_noise(raw: &str) -> &str {
    let trimmed = raw.trim();
    TITLE_NOISE_PREFIXES
        .iter()
        .find_map(|prefix| {
            trimmed
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| trimmed[prefix.len()..].trim_start())
        })
        .unwrap_or(trimmed)
}

/// Runs the strategies in priority order.
pub fn split_title(raw: &str) -> Option<TitleSplit> {
    let cleaned = strip_title_noise(raw);
    TITLE_STRATEGIES.iter().find_map(|strategy| strategy(cleaned))
}

/// "acme-corp" -> "Acme Corp".
fn humanize_slug(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c == '.')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Company name from the URL: ATS organization slug, else the registrable domain label.
pub fn company_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if PATH_SLUG_ATS.contains(&host) {
        let slug = parsed.path_segments()?.find(|s| !s.is_empty())?;
        return Some(humanize_slug(slug));
    }

    if let Some(sub) = SUBDOMAIN_ATS
        .iter()
        .find_map(|d| host.strip_suffix(*d)?.strip_suffix('.'))
    {
        return sub.rsplit('.').next().map(humanize_slug);
    }

    let labels: Vec<&str> = host
        .split('.')
        .filter(|l| !GENERIC_HOST_LABELS.contains(l))
        .collect();
    let label = match labels.as_slice() {
        [] => return None,
        [only] => *only,
        [.., owner, sld, tld] if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(sld) => *owner,
        [.., name, _tld] => *name,
    };
    Some(humanize_slug(label))
}

/// Extraction with the reason a result was dropped.
pub fn extract_with_reason(
    raw: &RawResult,
    filters: &DedupFilters<'_>,
    now: DateTime<Utc>,
) -> Result<JobListing, DropReason> {
    let url = raw.link.trim();
    filters.check_url(url)?;

    let (company, title) = match split_title(&raw.title) {
        Some(split) => (split.company, split.title),
        None => {
            let company = company_from_url(url).ok_or(DropReason::InvalidUrl)?;
            (company, raw.title.trim().to_string())
        }
    };

    filters.check_record(&company, &title)?;

    Ok(JobListing {
        company,
        title,
        url: url.to_string(),
        posted: parse_provider_date(&raw.date, now),
    })
}

#[allow(dead_code)]
/// `None` when the result is a session duplicate, an aggregator link, or already in the CRM.
pub fn extract_listing(
    raw: &RawResult,
    existing: &[ExistingJobRecord],
    seen: &HashSet<String>,
) -> Option<JobListing> {
    extract_with_reason(raw, &DedupFilters::new(existing, seen), Utc::now()).ok()
}

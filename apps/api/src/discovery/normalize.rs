//! Canonical forms of company names and job titles used for fuzzy dedup.

/// Legal-entity and corporate-structure suffixes dropped from company names.
const COMPANY_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "llc",
    "corp",
    "corporation",
    "ltd",
    "limited",
    "co",
    "company",
    "gmbh",
    "plc",
    "holdings",
    "group",
    "technologies",
];

/// Seniority modifiers removed from the start of a title. Longest first.
const TITLE_PREFIXES: &[&str] = &[
    "principal ",
    "associate ",
    "senior ",
    "junior ",
    "staff ",
    "lead ",
    "sr. ",
    "jr. ",
    "sr ",
    "jr ",
];

/// Lowercases, trims, and strips trailing legal suffixes ("Google Inc." -> "google").
pub fn normalize_company(name: &str) -> String {
    let mut s = name.trim().to_lowercase();
    loop {
        let trimmed = s.trim_end_matches(|c: char| c == '.' || c == ',' || c.is_whitespace());
        let stripped = COMPANY_SUFFIXES.iter().find_map(|suffix| {
            trimmed
                .strip_suffix(suffix)
                .filter(|rest| rest.ends_with(|c: char| c.is_whitespace() || c == ','))
        });
        match stripped {
            Some(rest) => s = rest.to_string(),
            None => {
                s = trimmed.to_string();
                break;
            }
        }
    }
    s
}

/// Lowercases, trims, and strips one leading seniority modifier.
pub fn normalize_title(title: &str) -> String {
    let s = title.trim().to_lowercase();
    TITLE_PREFIXES
        .iter()
        .find_map(|prefix| s.strip_prefix(prefix))
        .map(|rest| rest.trim_start().to_string())
        .unwrap_or(s)
}

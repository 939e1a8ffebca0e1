use std::time::Duration;

use anyhow::{Context, Result};

use crate::discovery::quota::{DEFAULT_MAX_CONCURRENT_SEARCHES, DEFAULT_MAX_SEARCHES_PER_TURN};
use crate::discovery::tool::ToolSettings;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub serpapi_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_searches_per_turn: usize,
    pub max_concurrent_searches: usize,
    pub verify_posting_dates: bool,
    pub default_max_age_days: i64,
    /// Upper bound on a single tool invocation; the search is cancelled after it.
    pub tool_deadline: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            serpapi_api_key: require_env("SERPAPI_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_searches_per_turn: parse_env("MAX_SEARCHES_PER_TURN", DEFAULT_MAX_SEARCHES_PER_TURN)?,
            max_concurrent_searches: parse_env(
                "MAX_CONCURRENT_SEARCHES",
                DEFAULT_MAX_CONCURRENT_SEARCHES,
            )?,
            verify_posting_dates: parse_env("VERIFY_POSTING_DATES", true)?,
            default_max_age_days: parse_env("DEFAULT_MAX_AGE_DAYS", 30)?,
            tool_deadline: Duration::from_secs(parse_env("TOOL_DEADLINE_SECS", 60)?),
        })
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            max_searches_per_turn: self.max_searches_per_turn,
            max_concurrent_searches: self.max_concurrent_searches,
            verify_posting_dates: self.verify_posting_dates,
            default_max_age_days: self.default_max_age_days,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_ok() {
        assert_eq!(parse_value::<u16>("PORT", " 9000 ").unwrap(), 9000);
        assert!(!parse_value::<bool>("VERIFY_POSTING_DATES", "false").unwrap());
    }

    #[test]
    fn test_parse_value_invalid_names_variable() {
        let err = parse_value::<usize>("MAX_SEARCHES_PER_TURN", "three").unwrap_err();
        assert!(err.to_string().contains("MAX_SEARCHES_PER_TURN"));
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        assert_eq!(
            parse_env("JOBSCOUT_TEST_SURELY_UNSET_VAR", 42usize).unwrap(),
            42
        );
    }
}

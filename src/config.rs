use crate::upload::{OnPollExhausted, PollSettings};
use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Uploader configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub poll: PollSettings,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = PollSettings::default();

        let interval_ms: u64 = parse_or(&lookup, "POLL_INTERVAL_MS", 2000)?;
        if interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }

        let on_exhausted = match lookup("POLL_ON_FAILURE").as_deref().map(str::trim) {
            None | Some("") | Some("freeze") => OnPollExhausted::Freeze,
            Some("fail") => OnPollExhausted::Fail,
            Some(other) => bail!("POLL_ON_FAILURE must be 'freeze' or 'fail', got '{other}'"),
        };

        let max_ticks = match lookup("POLL_MAX_TICKS") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u32>()
                    .context("POLL_MAX_TICKS must be a positive integer")?,
            ),
            _ => None,
        };

        Ok(Config {
            api_url: lookup("RESUME_API_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            api_token: lookup("RESUME_API_TOKEN").filter(|token| !token.trim().is_empty()),
            poll: PollSettings {
                interval: Duration::from_millis(interval_ms),
                max_failures: parse_or(&lookup, "POLL_MAX_FAILURES", defaults.max_failures)?,
                on_exhausted,
                max_ticks,
            },
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)?),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Default request headers: the bearer token, if one is configured.
    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("RESUME_API_TOKEN is not a valid header value")?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        _ => Ok(default),
    }
}

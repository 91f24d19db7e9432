//! Configuration module
//!
//! Connection, retry and concurrency settings for the API client, loaded from
//! the environment (optionally through a `.env` file).

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use crate::constants::META_DATA_MINIMUM;

// Common constants
const MAX_CONCURRENT_REQUESTS: usize = 1000;
const MAX_MEDIA_ENTRIES: usize = 100;
const CONNECTION_POOL_LIMIT: usize = 20;
const RETRIES: i64 = 3;
const RETRY_INTERVAL_MS: u64 = 900;
const RETRY_BACKOFF: f64 = 1.5;
const TIMEOUT_MS: u64 = 15_900;
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(300);

/// Status codes answered by a transient server fault.
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

/// How many times a failed request is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retries {
    /// Keep retrying until a request succeeds or fails terminally.
    Indefinitely,
    /// Retry up to n times, i.e. at most n + 1 attempts.
    Times(u32),
}

impl Retries {
    /// Maps the conventional integer form: any negative value retries forever.
    pub fn from_count(count: i64) -> Self {
        if count < 0 {
            Retries::Indefinitely
        } else {
            Retries::Times(u32::try_from(count).unwrap_or(u32::MAX))
        }
    }

    /// Maximum number of attempts, `None` when unbounded.
    pub fn max_attempts(&self) -> Option<u64> {
        match self {
            Retries::Indefinitely => None,
            Retries::Times(n) => Some(u64::from(*n) + 1),
        }
    }

    /// Whether `attempts` already made exhaust the budget.
    pub fn exhausted(&self, attempts: u64) -> bool {
        self.max_attempts().is_some_and(|max| attempts >= max)
    }
}

/// Retry, backoff and timeout policy applied to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub retries: Retries,
    /// Sleep before the first retry.
    pub interval: Duration,
    /// Factor applied to the interval after every retry.
    pub backoff: f64,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: Retries::Times(RETRIES as u32),
            interval: Duration::from_millis(RETRY_INTERVAL_MS),
            backoff: RETRY_BACKOFF,
            timeout: Duration::from_millis(TIMEOUT_MS),
            retryable_status_codes: RETRYABLE_STATUS_CODES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(mut self, retries: Retries) -> Self {
        self.retries = retries;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Interval to sleep after `interval`, scaled by the backoff factor and
    /// capped at five minutes.
    pub fn next_interval(&self, interval: Duration) -> Duration {
        Duration::try_from_secs_f64(interval.as_secs_f64() * self.backoff)
            .map_or(MAX_RETRY_INTERVAL, |next| next.min(MAX_RETRY_INTERVAL))
    }
}

/// Development mode shortens the nominal playback duration of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    Development,
    #[default]
    Production,
}

impl PlaybackMode {
    /// Inclusive range of nominal playback seconds drawn for each entry.
    pub fn duration_range(&self) -> std::ops::RangeInclusive<u32> {
        match self {
            PlaybackMode::Development => 3..=5,
            PlaybackMode::Production => 60..=120,
        }
    }
}

/// Player configuration
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub playback_mode: PlaybackMode,
    /// Extra meta keys to request and display. Always widened by the minimum set.
    pub meta_data_white_list: Vec<String>,
    pub max_concurrent_requests: usize,
    /// Default cap on entries discovered per listing.
    pub max_media_entries: usize,
    pub connection_pool_limit: usize,
    pub retry: RetryPolicy,
}

impl PlayerConfig {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            playback_mode: PlaybackMode::default(),
            meta_data_white_list: Vec::new(),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            max_media_entries: MAX_MEDIA_ENTRIES,
            connection_pool_limit: CONNECTION_POOL_LIMIT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_url = env::var("MADEK_API_URL")
            .or_else(|_| env::var("API_URL"))
            .map_err(|_| anyhow::anyhow!("MADEK_API_URL (or API_URL) must be set"))?;
        let username = env::var("MADEK_API_USER")
            .map_err(|_| anyhow::anyhow!("MADEK_API_USER must be set"))?;
        let password = env::var("MADEK_API_PASSWORD")
            .map_err(|_| anyhow::anyhow!("MADEK_API_PASSWORD must be set"))?;

        let dev_mode = env::var("PLAYER_DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            .parse()
            .unwrap_or(false);

        let meta_data_white_list = env::var("META_DATA_WHITE_LIST")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let retry = RetryPolicy {
            retries: Retries::from_count(
                env::var("API_RETRIES")
                    .unwrap_or_else(|_| RETRIES.to_string())
                    .parse()
                    .unwrap_or(RETRIES),
            ),
            interval: Duration::from_millis(
                env::var("API_RETRY_INTERVAL_MS")
                    .unwrap_or_else(|_| RETRY_INTERVAL_MS.to_string())
                    .parse()
                    .unwrap_or(RETRY_INTERVAL_MS),
            ),
            backoff: env::var("API_RETRY_BACKOFF")
                .unwrap_or_else(|_| RETRY_BACKOFF.to_string())
                .parse()
                .unwrap_or(RETRY_BACKOFF),
            timeout: Duration::from_millis(
                env::var("API_TIMEOUT_MS")
                    .unwrap_or_else(|_| TIMEOUT_MS.to_string())
                    .parse()
                    .unwrap_or(TIMEOUT_MS),
            ),
            retryable_status_codes: RETRYABLE_STATUS_CODES.to_vec(),
        };

        let config = PlayerConfig {
            playback_mode: if dev_mode {
                PlaybackMode::Development
            } else {
                PlaybackMode::Production
            },
            meta_data_white_list,
            max_concurrent_requests: env::var("API_MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| MAX_CONCURRENT_REQUESTS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_REQUESTS),
            max_media_entries: env::var("API_MAX_MEDIA_ENTRIES")
                .unwrap_or_else(|_| MAX_MEDIA_ENTRIES.to_string())
                .parse()
                .unwrap_or(MAX_MEDIA_ENTRIES),
            connection_pool_limit: env::var("API_CONNECTION_POOL_LIMIT")
                .unwrap_or_else(|_| CONNECTION_POOL_LIMIT.to_string())
                .parse()
                .unwrap_or(CONNECTION_POOL_LIMIT),
            retry,
            ..PlayerConfig::new(server_url, username, password)
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server_url.is_empty() {
            return Err(anyhow::anyhow!("MADEK_API_URL must not be empty"));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "MADEK_API_URL must start with http:// or https://"
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!(
                "API_MAX_CONCURRENT_REQUESTS must be greater than zero"
            ));
        }
        if !self.retry.backoff.is_finite() || self.retry.backoff < 1.0 {
            return Err(anyhow::anyhow!(
                "API_RETRY_BACKOFF must be a finite number of at least 1.0"
            ));
        }
        if self.retry.timeout.is_zero() {
            return Err(anyhow::anyhow!("API_TIMEOUT_MS must be greater than zero"));
        }
        Ok(())
    }

    /// Configured white list widened by the minimum meta keys, sorted.
    pub fn meta_data_white_list(&self) -> Vec<String> {
        widen_white_list(&self.meta_data_white_list)
    }
}

/// Union of `keys` and the minimum meta keys, deduplicated and sorted.
pub fn widen_white_list<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    keys.iter()
        .map(|k| k.as_ref().to_string())
        .chain(META_DATA_MINIMUM.iter().map(|k| k.to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_budget() {
        assert_eq!(Retries::from_count(-1), Retries::Indefinitely);
        assert_eq!(Retries::from_count(0).max_attempts(), Some(1));
        assert_eq!(Retries::from_count(3).max_attempts(), Some(4));
        assert!(Retries::Times(0).exhausted(1));
        assert!(!Retries::Times(2).exhausted(2));
        assert!(Retries::Times(2).exhausted(3));
        assert!(!Retries::Indefinitely.exhausted(u64::MAX));
    }

    #[test]
    fn default_policy_backoff_sequence() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(900));
        assert_eq!(
            policy.next_interval(policy.interval),
            Duration::from_millis(1350)
        );
        assert!(policy.is_retryable_status(503));
        assert!(!policy.is_retryable_status(404));
    }

    #[test]
    fn new_trims_trailing_slash() {
        let config = PlayerConfig::new("https://medienarchiv.zhdk.ch/", "u", "p");
        assert_eq!(config.server_url, "https://medienarchiv.zhdk.ch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = PlayerConfig::new("ftp://host", "u", "p");
        assert!(config.validate().is_err());

        config.server_url = "http://host".into();
        config.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_requests = 10;
        config.retry.backoff = 0.5;
        assert!(config.validate().is_err());

        config.retry.backoff = f64::INFINITY;
        assert!(config.validate().is_err());

        config.retry.backoff = f64::NAN;
        assert!(config.validate().is_err());

        config.retry.backoff = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn next_interval_saturates() {
        let policy = RetryPolicy::default();
        let mut interval = policy.interval;
        for _ in 0..500 {
            interval = policy.next_interval(interval);
        }
        assert_eq!(interval, MAX_RETRY_INTERVAL);

        let runaway = RetryPolicy {
            backoff: f64::INFINITY,
            ..RetryPolicy::default()
        };
        assert_eq!(runaway.next_interval(runaway.interval), MAX_RETRY_INTERVAL);
    }

    #[test]
    fn white_list_always_contains_minimum() {
        let widened = widen_white_list(&["madek_core:keywords", "madek_core:title"]);
        assert_eq!(
            widened,
            vec![
                "madek_core:authors",
                "madek_core:copyright_notice",
                "madek_core:keywords",
                "madek_core:title",
            ]
        );
    }

    #[test]
    fn playback_ranges() {
        assert_eq!(PlaybackMode::Development.duration_range(), 3..=5);
        assert_eq!(PlaybackMode::Production.duration_range(), 60..=120);
    }
}

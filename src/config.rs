use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3001";
const DEFAULT_NICKNAME: &str = "admin";
const DEFAULT_TOKEN_FILE: &str = ".cartesian/auth_token";
const DEFAULT_VIEWER_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DEBOUNCE_MS: u64 = 1000;
const DEFAULT_RETRY_MS: u64 = 3000;
const DEFAULT_READ_RETRIES: u32 = 1;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Client configuration, read from `CARTESIAN_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the backend REST API.
    pub api_url: String,
    /// Name shown in the greeting.
    pub nickname: String,
    /// File holding the bearer token.
    pub token_path: PathBuf,
    /// Quiet period before queued axis updates are flushed.
    pub debounce: Duration,
    /// How many times a failed read is retried.
    pub read_retries: u32,
    /// Delay between a failed read and its retry.
    pub retry_interval: Duration,
    pub request_timeout: Duration,
    /// Listen address of the browser viewer.
    pub viewer_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            nickname: DEFAULT_NICKNAME.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            read_retries: DEFAULT_READ_RETRIES,
            retry_interval: Duration::from_millis(DEFAULT_RETRY_MS),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            viewer_addr: DEFAULT_VIEWER_ADDR.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup. Unset, empty or
    /// unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(default))
        };
        let defaults = Config::default();

        Config {
            api_url: get("CARTESIAN_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            nickname: get("CARTESIAN_NICKNAME").unwrap_or(defaults.nickname),
            token_path: get("CARTESIAN_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_path),
            debounce: millis("CARTESIAN_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            read_retries: get("CARTESIAN_READ_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.read_retries),
            retry_interval: millis("CARTESIAN_RETRY_MS", DEFAULT_RETRY_MS),
            request_timeout: millis("CARTESIAN_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
            viewer_addr: get("CARTESIAN_VIEWER_ADDR").unwrap_or(defaults.viewer_addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("CARTESIAN_API_URL", "https://api.example.org/"),
            ("CARTESIAN_NICKNAME", "mei"),
            ("CARTESIAN_DEBOUNCE_MS", "250"),
            ("CARTESIAN_READ_RETRIES", "0"),
        ]));
        assert_eq!(config.api_url, "https://api.example.org");
        assert_eq!(config.nickname, "mei");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.read_retries, 0);
        assert_eq!(config.retry_interval, Duration::from_millis(3000));
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[
            ("CARTESIAN_DEBOUNCE_MS", "soon"),
            ("CARTESIAN_NICKNAME", "  "),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(1000));
        assert_eq!(config.nickname, "admin");
    }
}

// src/config.rs
//! Static configuration: poll cadence, dedup store, failure window, HTTP
//! client and the query list. Loaded once at startup; any problem here is
//! fatal and the process exits before entering the loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::Deserialize;

use crate::error::WatchError;
use crate::source::Query;

pub const ENV_CONFIG_PATH: &str = "WATCHER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/watcher.toml";
/// Upper bound for `failures.window_secs` (one week).
pub const MAX_FAILURE_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollCfg {
    pub query_delay_secs: u64,
    pub round_delay_secs: u64,
    pub fetch_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub restart_delay_secs: u64,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self {
            query_delay_secs: 20,
            round_delay_secs: 500,
            fetch_timeout_secs: 20,
            notify_timeout_secs: 15,
            restart_delay_secs: 5,
        }
    }
}

impl PollCfg {
    pub fn query_delay(&self) -> Duration {
        Duration::from_secs(self.query_delay_secs)
    }
    pub fn round_delay(&self) -> Duration {
        Duration::from_secs(self.round_delay_secs)
    }
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

/// `capacity = None` keeps every identity for the life of the process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DedupCfg {
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailuresCfg {
    pub window_secs: u64,
    /// Escalate when the window holds more than this many failures.
    pub threshold: usize,
}

impl FailuresCfg {
    /// The window as a chrono span; `None` when zero or above
    /// [`MAX_FAILURE_WINDOW_SECS`].
    pub fn window(&self) -> Option<chrono::Duration> {
        if self.window_secs == 0 || self.window_secs > MAX_FAILURE_WINDOW_SECS {
            return None;
        }
        i64::try_from(self.window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

impl Default for FailuresCfg {
    fn default() -> Self {
        Self {
            window_secs: 30 * 60,
            threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub user_agent: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            base_url: "https://www.kleinanzeigen.de".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryCfg {
    pub url: String,
    #[serde(default)]
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll: PollCfg,
    pub dedup: DedupCfg,
    pub failures: FailuresCfg,
    pub http: HttpCfg,
    pub queries: Vec<QueryCfg>,
}

/// Validated configuration with compiled queries.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: WatcherConfig,
    pub queries: Vec<Query>,
    pub failure_window: chrono::Duration,
}

impl WatcherConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing watcher config TOML")
    }

    /// Check invariants and compile the query list.
    pub fn validate(self) -> std::result::Result<Settings, WatchError> {
        if self.queries.is_empty() {
            return Err(WatchError::config("at least one [[queries]] entry is required"));
        }
        for (name, secs) in [
            ("poll.fetch_timeout_secs", self.poll.fetch_timeout_secs),
            ("poll.notify_timeout_secs", self.poll.notify_timeout_secs),
            ("http.timeout_secs", self.http.timeout_secs),
        ] {
            if secs == 0 {
                return Err(WatchError::config(format!("{name} must be greater than 0")));
            }
        }
        let failure_window = self.failures.window().ok_or_else(|| {
            WatchError::config(format!(
                "failures.window_secs must be between 1 and {MAX_FAILURE_WINDOW_SECS}"
            ))
        })?;
        if self.dedup.capacity == Some(0) {
            return Err(WatchError::config("dedup.capacity must be greater than 0"));
        }
        reqwest::Url::parse(&self.http.base_url)
            .map_err(|e| WatchError::config(format!("http.base_url: {e}")))?;

        let queries = self
            .queries
            .iter()
            .enumerate()
            .map(|(i, q)| compile_query(i, q))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Settings {
            config: self,
            queries,
            failure_window,
        })
    }
}

fn compile_query(i: usize, q: &QueryCfg) -> std::result::Result<Query, WatchError> {
    let url = q.url.trim();
    reqwest::Url::parse(url)
        .map_err(|e| WatchError::config(format!("queries[{i}].url {url:?}: {e}")))?;

    let mut query = Query::new(url);
    if let Some(pat) = q.exclude.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        let re = RegexBuilder::new(pat)
            .case_insensitive(true)
            .build()
            .map_err(|e| WatchError::config(format!("queries[{i}].exclude {pat:?}: {e}")))?;
        query = query.with_exclude(re);
    }
    Ok(query)
}

/// Load and validate configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading watcher config from {}", path.display()))?;
    let cfg = WatcherConfig::from_toml_str(&content)
        .with_context(|| format!("in {}", path.display()))?;
    let settings = cfg
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(settings)
}

/// Resolve the config path: $WATCHER_CONFIG_PATH, else `config/watcher.toml`.
pub fn config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_config_default() -> Result<Settings> {
    load_config_from(&config_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = WatcherConfig::from_toml_str(
            r#"
            [[queries]]
            url = "https://www.kleinanzeigen.de/s-preis:25:30/mario-kart-8-deluxe/k0"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.poll.query_delay_secs, 20);
        assert_eq!(cfg.poll.round_delay_secs, 500);
        assert_eq!(cfg.failures.window_secs, 1800);
        assert_eq!(cfg.failures.threshold, 2);
        assert!(cfg.dedup.capacity.is_none());
        let s = cfg.validate().unwrap();
        assert_eq!(s.queries.len(), 1);
        assert!(s.queries[0].exclude.is_none());
    }

    #[test]
    fn exclusion_is_case_insensitive() {
        let cfg = WatcherConfig::from_toml_str(
            r#"
            [[queries]]
            url = "https://example.org/search"
            exclude = "schaden|defekt|reparatur"
            "#,
        )
        .unwrap();
        let s = cfg.validate().unwrap();
        let re = s.queries[0].exclude.as_ref().unwrap();
        assert!(re.is_match("Display DEFEKT"));
        assert!(!re.is_match("wie neu"));
    }

    #[test]
    fn blank_exclusion_means_none() {
        let cfg = WatcherConfig::from_toml_str(
            r#"
            [[queries]]
            url = "https://example.org/search"
            exclude = "  "
            "#,
        )
        .unwrap();
        assert!(cfg.validate().unwrap().queries[0].exclude.is_none());
    }

    #[test]
    fn rejects_empty_query_list() {
        let err = WatcherConfig::default().validate().unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn rejects_bad_regex_and_url() {
        let bad_re = WatcherConfig::from_toml_str(
            r#"
            [[queries]]
            url = "https://example.org/search"
            exclude = "(unclosed"
            "#,
        )
        .unwrap();
        assert!(bad_re.validate().is_err());

        let bad_url = WatcherConfig::from_toml_str(
            r#"
            [[queries]]
            url = "not a url"
            "#,
        )
        .unwrap();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeouts() {
        let cfg = WatcherConfig::from_toml_str(
            r#"
            [poll]
            fetch_timeout_secs = 0

            [[queries]]
            url = "https://example.org/search"
            "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("poll.fetch_timeout_secs"));
    }

    #[test]
    fn failure_window_must_fit_in_a_week() {
        for secs in ["0", "604801", "10000000000000", "10000000000000000"] {
            let cfg = WatcherConfig::from_toml_str(&format!(
                "[failures]\nwindow_secs = {secs}\n\n[[queries]]\nurl = \"https://example.org/search\"\n"
            ))
            .unwrap();
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("failures.window_secs"), "{secs}: {err}");
        }

        let week = WatcherConfig::from_toml_str(
            r#"
            [failures]
            window_secs = 604800

            [[queries]]
            url = "https://example.org/search"
            "#,
        )
        .unwrap();
        let s = week.validate().unwrap();
        assert_eq!(s.failure_window, chrono::Duration::weeks(1));
    }
}

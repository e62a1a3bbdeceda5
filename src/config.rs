// Runtime configuration.
// Policy constants for caching, pagination, sampling, and bulk operations.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

/// Largest page size the GitHub REST API accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Default TTL for the authenticated user's own data: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default TTL for data about other users: 1 hour.
pub const OTHER_USER_TTL: Duration = Duration::from_secs(60 * 60);

/// Default TTL for derived commit statistics: 6 hours.
pub const COMMIT_STATS_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Dashboard configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Prefix applied to every cache key.
    pub cache_namespace: String,
    /// Directory for the file-backed cache. `None` uses the platform cache dir.
    pub cache_dir: Option<PathBuf>,
    /// Byte budget for the cache, mirroring browser storage quotas.
    pub storage_quota_bytes: Option<u64>,
    /// Total write attempts before a cache write is abandoned.
    pub write_attempts: u32,
    /// Items requested per page.
    pub per_page: u32,
    /// Safety bound on pages fetched for one listing.
    pub max_pages: Option<u32>,
    /// The events API serves at most 300 events (3 pages of 100).
    pub event_max_pages: u32,
    #[serde(with = "secs")]
    pub default_ttl: Duration,
    #[serde(with = "secs")]
    pub other_user_ttl: Duration,
    #[serde(with = "secs")]
    pub commit_stats_ttl: Duration,
    /// Delay between unit operations of a bulk star/follow.
    #[serde(with = "millis")]
    pub batch_delay: Duration,
    /// How many followed users to sample gists from.
    pub gist_sample_users: usize,
    /// Gists kept per sampled user.
    pub gists_per_user: usize,
    /// Gists shown after merging.
    pub network_gist_limit: usize,
    /// Starred repositories shown in the recently-updated list.
    pub recent_starred_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_namespace: "ghdash_cache_".to_string(),
            cache_dir: None,
            storage_quota_bytes: Some(5 * 1024 * 1024),
            write_attempts: 3,
            per_page: MAX_PER_PAGE,
            max_pages: Some(100),
            event_max_pages: 3,
            default_ttl: DEFAULT_TTL,
            other_user_ttl: OTHER_USER_TTL,
            commit_stats_ttl: COMMIT_STATS_TTL,
            batch_delay: Duration::from_secs(1),
            gist_sample_users: 10,
            gists_per_user: 5,
            network_gist_limit: 20,
            recent_starred_limit: 10,
        }
    }
}

impl DashboardConfig {
    /// Build a config from defaults plus `GHDASH_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ns) = lookup("GHDASH_CACHE_NAMESPACE") {
            config.cache_namespace = ns;
        }
        if let Some(dir) = lookup("GHDASH_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(quota) = parse_var::<u64>(&lookup, "GHDASH_STORAGE_QUOTA") {
            config.storage_quota_bytes = (quota > 0).then_some(quota);
        }
        if let Some(per_page) = parse_var::<u32>(&lookup, "GHDASH_PER_PAGE") {
            config.per_page = per_page.clamp(1, MAX_PER_PAGE);
        }
        if let Some(pages) = parse_var::<u32>(&lookup, "GHDASH_MAX_PAGES") {
            config.max_pages = (pages > 0).then_some(pages);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GHDASH_TTL_SECS") {
            config.default_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GHDASH_OTHER_USER_TTL_SECS") {
            config.other_user_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GHDASH_BATCH_DELAY_MS") {
            config.batch_delay = Duration::from_millis(ms);
        }

        config
    }

    /// Resolve the cache directory, falling back to the platform cache dir.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            ProjectDirs::from("", "", "ghdash").map(|dirs| dirs.cache_dir().to_path_buf())
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {key}: could not parse '{raw}'");
            None
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.per_page, 100);
        assert_eq!(config.write_attempts, 3);
        assert_eq!(config.default_ttl, Duration::from_secs(86_400));
        assert_eq!(config.other_user_ttl, Duration::from_secs(3_600));
        assert_eq!(config.batch_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_env_overrides() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("GHDASH_PER_PAGE", "500"),
            ("GHDASH_MAX_PAGES", "0"),
            ("GHDASH_BATCH_DELAY_MS", "250"),
            ("GHDASH_TTL_SECS", "not-a-number"),
        ]));

        assert_eq!(config.per_page, MAX_PER_PAGE);
        assert_eq!(config.max_pages, None);
        assert_eq!(config.batch_delay, Duration::from_millis(250));
        assert_eq!(config.default_ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{ "default_ttl": 60, "batch_delay": 10 }"#).unwrap();
        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.batch_delay, Duration::from_millis(10));
        assert_eq!(config.per_page, MAX_PER_PAGE);
    }
}
